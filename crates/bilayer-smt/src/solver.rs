use std::collections::HashMap;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

/// A model (variable assignments) extracted from a SAT result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub values: HashMap<String, ModelValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelValue {
    Int(i64),
    Bool(bool),
    /// Real value, approximated when the solver reports an irrational
    /// algebraic number.
    Real(f64),
}

impl Model {
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ModelValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ModelValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Numeric value of `name`; integer assignments are widened.
    pub fn get_real(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ModelValue::Real(r)) => Some(*r),
            Some(ModelValue::Int(n)) => Some(*n as f64),
            _ => None,
        }
    }

    /// All real-valued assignments, suitable for [`crate::eval`].
    pub fn real_assignment(&self) -> HashMap<String, f64> {
        self.values
            .keys()
            .filter_map(|name| self.get_real(name).map(|v| (name.clone(), v)))
            .collect()
    }
}

/// Abstract SMT solver interface.
pub trait SmtSolver {
    type Error: std::error::Error;

    /// Declare a new variable.
    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error>;

    /// Assert a constraint.
    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    /// Push a new scope.
    fn push(&mut self) -> Result<(), Self::Error>;

    /// Pop a scope.
    fn pop(&mut self) -> Result<(), Self::Error>;

    /// Check satisfiability.
    fn check_sat(&mut self) -> Result<SatResult, Self::Error>;

    /// Check satisfiability and extract a model if SAT.
    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Self::Error>;

    /// Reset the solver state.
    fn reset(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct MockSolver {
        sat_result: SatResult,
        depth: usize,
        check_sat_calls: usize,
        reset_calls: usize,
    }

    impl MockSolver {
        fn new(sat_result: SatResult) -> Self {
            Self {
                sat_result,
                depth: 0,
                check_sat_calls: 0,
                reset_calls: 0,
            }
        }
    }

    impl SmtSolver for MockSolver {
        type Error = io::Error;

        fn declare_var(&mut self, _name: &str, _sort: &SmtSort) -> Result<(), Self::Error> {
            Ok(())
        }

        fn assert(&mut self, _term: &SmtTerm) -> Result<(), Self::Error> {
            Ok(())
        }

        fn push(&mut self) -> Result<(), Self::Error> {
            self.depth += 1;
            Ok(())
        }

        fn pop(&mut self) -> Result<(), Self::Error> {
            self.depth = self
                .depth
                .checked_sub(1)
                .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "pop on empty stack"))?;
            Ok(())
        }

        fn check_sat(&mut self) -> Result<SatResult, Self::Error> {
            self.check_sat_calls += 1;
            Ok(self.sat_result.clone())
        }

        fn check_sat_with_model(
            &mut self,
            _var_names: &[(&str, &SmtSort)],
        ) -> Result<(SatResult, Option<Model>), Self::Error> {
            Ok((self.check_sat()?, None))
        }

        fn reset(&mut self) -> Result<(), Self::Error> {
            self.reset_calls += 1;
            self.depth = 0;
            Ok(())
        }
    }

    #[test]
    fn model_getters_return_typed_values_only() {
        let mut values = HashMap::new();
        values.insert("x".to_string(), ModelValue::Int(42));
        values.insert("flag".to_string(), ModelValue::Bool(true));
        values.insert("S_0".to_string(), ModelValue::Real(0.25));
        let model = Model { values };

        assert_eq!(model.get_int("x"), Some(42));
        assert_eq!(model.get_bool("flag"), Some(true));
        assert_eq!(model.get_real("S_0"), Some(0.25));
        assert_eq!(model.get_real("x"), Some(42.0));
        assert_eq!(model.get_int("S_0"), None);
        assert_eq!(model.get_real("flag"), None);
        assert_eq!(model.get_bool("missing"), None);
    }

    #[test]
    fn real_assignment_skips_booleans() {
        let mut values = HashMap::new();
        values.insert("flag".to_string(), ModelValue::Bool(false));
        values.insert("S_0".to_string(), ModelValue::Real(0.5));
        let env = Model { values }.real_assignment();
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("S_0"), Some(&0.5));
    }

    #[test]
    fn scopes_and_reset_go_through_the_trait() {
        let mut solver = MockSolver::new(SatResult::Unknown("timeout".to_string()));
        solver.push().expect("push");
        solver.pop().expect("pop");
        assert!(solver.pop().is_err());

        let (result, model) = solver.check_sat_with_model(&[]).expect("check");
        assert_eq!(result, SatResult::Unknown("timeout".to_string()));
        assert!(model.is_none());
        assert_eq!(solver.check_sat_calls, 1);

        solver.reset().expect("reset should succeed");
        assert_eq!(solver.reset_calls, 1);
    }
}
