use std::collections::HashMap;

use thiserror::Error;
use z3::SatResult as Z3SatResult;

use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
}

pub struct Z3Solver {
    solver: z3::Solver,
    int_vars: HashMap<String, z3::ast::Int>,
    real_vars: HashMap<String, z3::ast::Real>,
    bool_vars: HashMap<String, z3::ast::Bool>,
    params: Option<z3::Params>,
}

impl Z3Solver {
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            int_vars: HashMap::new(),
            real_vars: HashMap::new(),
            bool_vars: HashMap::new(),
            params: None,
        }
    }

    pub fn with_timeout_ms(timeout_ms: u32) -> Self {
        if timeout_ms == 0 {
            return Self::new();
        }
        let mut solver = Self::new();
        let mut params = z3::Params::new();
        params.set_u32("timeout", timeout_ms);
        solver.solver.set_params(&params);
        solver.params = Some(params);
        solver
    }

    fn translate_term(&self, term: &SmtTerm) -> Result<Z3Term, Z3Error> {
        match term {
            SmtTerm::Var(name) => {
                if let Some(v) = self.real_vars.get(name) {
                    Ok(Z3Term::Real(v.clone()))
                } else if let Some(v) = self.int_vars.get(name) {
                    Ok(Z3Term::Int(v.clone()))
                } else if let Some(v) = self.bool_vars.get(name) {
                    Ok(Z3Term::Bool(v.clone()))
                } else {
                    Err(Z3Error::UnknownVariable(name.clone()))
                }
            }
            SmtTerm::IntLit(n) => Ok(Z3Term::Int(z3::ast::Int::from_i64(*n))),
            SmtTerm::RealLit(n) => Ok(Z3Term::Real(z3::ast::Real::from_int(
                &z3::ast::Int::from_i64(*n),
            ))),
            SmtTerm::BoolLit(b) => Ok(Z3Term::Bool(z3::ast::Bool::from_bool(*b))),
            SmtTerm::Add(lhs, rhs) => self.arith(lhs, rhs, |l, r| l + r, |l, r| l + r),
            SmtTerm::Sub(lhs, rhs) => self.arith(lhs, rhs, |l, r| l - r, |l, r| l - r),
            SmtTerm::Mul(lhs, rhs) => self.arith(lhs, rhs, |l, r| l * r, |l, r| l * r),
            SmtTerm::Neg(inner) => match self.translate_term(inner)? {
                Z3Term::Int(i) => Ok(Z3Term::Int(i.unary_minus())),
                Z3Term::Real(r) => Ok(Z3Term::Real(r.unary_minus())),
                Z3Term::Bool(_) => Err(Z3Error::Internal("Expected number, got Bool".into())),
            },
            SmtTerm::Eq(lhs, rhs) => {
                let l = self.translate_term(lhs)?;
                let r = self.translate_term(rhs)?;
                match (l, r) {
                    (Z3Term::Int(li), Z3Term::Int(ri)) => Ok(Z3Term::Bool(li.eq(&ri))),
                    (Z3Term::Bool(lb), Z3Term::Bool(rb)) => Ok(Z3Term::Bool(lb.eq(&rb))),
                    (Z3Term::Bool(_), _) | (_, Z3Term::Bool(_)) => {
                        Err(Z3Error::Internal("Sort mismatch in Eq".into()))
                    }
                    (l, r) => Ok(Z3Term::Bool(l.into_real()?.eq(&r.into_real()?))),
                }
            }
            SmtTerm::Lt(lhs, rhs) => self.compare(lhs, rhs, |l, r| l.lt(r)),
            SmtTerm::Le(lhs, rhs) => self.compare(lhs, rhs, |l, r| l.le(r)),
            SmtTerm::Gt(lhs, rhs) => self.compare(lhs, rhs, |l, r| l.gt(r)),
            SmtTerm::Ge(lhs, rhs) => self.compare(lhs, rhs, |l, r| l.ge(r)),
            SmtTerm::And(terms) => {
                let bools = self.translate_bools(terms)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::and(&refs)))
            }
            SmtTerm::Or(terms) => {
                let bools = self.translate_bools(terms)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::or(&refs)))
            }
            SmtTerm::Not(inner) => {
                let b = self.translate_term(inner)?.into_bool()?;
                Ok(Z3Term::Bool(b.not()))
            }
            SmtTerm::Implies(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bool()?;
                let r = self.translate_term(rhs)?.into_bool()?;
                Ok(Z3Term::Bool(l.implies(&r)))
            }
            SmtTerm::Ite(cond, then, els) => {
                let c = self.translate_term(cond)?.into_bool()?;
                let t = self.translate_term(then)?;
                let e = self.translate_term(els)?;
                match (t, e) {
                    (Z3Term::Int(ti), Z3Term::Int(ei)) => Ok(Z3Term::Int(c.ite(&ti, &ei))),
                    (Z3Term::Bool(tb), Z3Term::Bool(eb)) => Ok(Z3Term::Bool(c.ite(&tb, &eb))),
                    (Z3Term::Bool(_), _) | (_, Z3Term::Bool(_)) => {
                        Err(Z3Error::Internal("Sort mismatch in ITE".into()))
                    }
                    (t, e) => Ok(Z3Term::Real(c.ite(&t.into_real()?, &e.into_real()?))),
                }
            }
        }
    }

    fn translate_bools(&self, terms: &[SmtTerm]) -> Result<Vec<z3::ast::Bool>, Z3Error> {
        terms
            .iter()
            .map(|t| self.translate_term(t).and_then(|z| z.into_bool()))
            .collect()
    }

    /// Integer arithmetic when both sides are Int, real arithmetic otherwise.
    fn arith(
        &self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
        int_op: impl Fn(&z3::ast::Int, &z3::ast::Int) -> z3::ast::Int,
        real_op: impl Fn(&z3::ast::Real, &z3::ast::Real) -> z3::ast::Real,
    ) -> Result<Z3Term, Z3Error> {
        match (self.translate_term(lhs)?, self.translate_term(rhs)?) {
            (Z3Term::Int(l), Z3Term::Int(r)) => Ok(Z3Term::Int(int_op(&l, &r))),
            (l, r) => Ok(Z3Term::Real(real_op(&l.into_real()?, &r.into_real()?))),
        }
    }

    fn compare(
        &self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
        op: impl Fn(&z3::ast::Real, &z3::ast::Real) -> z3::ast::Bool,
    ) -> Result<Z3Term, Z3Error> {
        let l = self.translate_term(lhs)?.into_real()?;
        let r = self.translate_term(rhs)?.into_real()?;
        Ok(Z3Term::Bool(op(&l, &r)))
    }
}

enum Z3Term {
    Int(z3::ast::Int),
    Real(z3::ast::Real),
    Bool(z3::ast::Bool),
}

impl Z3Term {
    /// Integers are widened; booleans are a sort error.
    fn into_real(self) -> Result<z3::ast::Real, Z3Error> {
        match self {
            Z3Term::Real(r) => Ok(r),
            Z3Term::Int(i) => Ok(z3::ast::Real::from_int(&i)),
            Z3Term::Bool(_) => Err(Z3Error::Internal("Expected Real, got Bool".into())),
        }
    }

    fn into_bool(self) -> Result<z3::ast::Bool, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            Z3Term::Int(_) | Z3Term::Real(_) => {
                Err(Z3Error::Internal("Expected Bool, got a number".into()))
            }
        }
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Z3Error> {
        match sort {
            SmtSort::Int => {
                self.int_vars
                    .insert(name.to_string(), z3::ast::Int::new_const(name));
            }
            SmtSort::Real => {
                self.real_vars
                    .insert(name.to_string(), z3::ast::Real::new_const(name));
            }
            SmtSort::Bool => {
                self.bool_vars
                    .insert(name.to_string(), z3::ast::Bool::new_const(name));
            }
        }
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let z3_term = self.translate_term(term)?.into_bool()?;
        self.solver.assert(&z3_term);
        Ok(())
    }

    fn push(&mut self) -> Result<(), Z3Error> {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Z3Error> {
        self.solver.pop(1);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => Ok(SatResult::Sat),
            Z3SatResult::Unsat => Ok(SatResult::Unsat),
            Z3SatResult::Unknown => Ok(SatResult::Unknown("Z3 returned unknown".into())),
        }
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => {
                let z3_model = self
                    .solver
                    .get_model()
                    .ok_or_else(|| Z3Error::Internal("SAT but no model available".into()))?;
                let mut values = HashMap::new();

                for &(name, sort) in var_names {
                    let value = match sort {
                        SmtSort::Int => self
                            .int_vars
                            .get(name)
                            .and_then(|v| z3_model.eval::<z3::ast::Int>(v, true))
                            .and_then(|val| val.as_i64())
                            .map(ModelValue::Int),
                        SmtSort::Real => self
                            .real_vars
                            .get(name)
                            .and_then(|v| z3_model.eval::<z3::ast::Real>(v, true))
                            .and_then(|val| val.as_real())
                            .filter(|&(_, den)| den != 0)
                            .map(|(num, den)| ModelValue::Real(num as f64 / den as f64)),
                        SmtSort::Bool => self
                            .bool_vars
                            .get(name)
                            .and_then(|v| z3_model.eval::<z3::ast::Bool>(v, true))
                            .and_then(|val| val.as_bool())
                            .map(ModelValue::Bool),
                    };
                    if let Some(value) = value {
                        values.insert(name.to_string(), value);
                    }
                }

                Ok((SatResult::Sat, Some(Model { values })))
            }
            Z3SatResult::Unsat => Ok((SatResult::Unsat, None)),
            Z3SatResult::Unknown => Ok((SatResult::Unknown("Z3 returned unknown".into()), None)),
        }
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        // Z3 may drop per-solver parameters on reset.
        if let Some(params) = &self.params {
            self.solver.set_params(params);
        }
        self.int_vars.clear();
        self.real_vars.clear();
        self.bool_vars.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn z3_nonlinear_real_sat() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("k", &SmtSort::Real)?;
        solver.declare_var("x", &SmtSort::Real)?;

        // k*x == 1 && x == 4
        solver.assert(&SmtTerm::and(vec![
            SmtTerm::var("k").mul(SmtTerm::var("x")).eq(SmtTerm::real(1)),
            SmtTerm::var("x").eq(SmtTerm::real(4)),
        ]))?;
        let (result, model) = solver.check_sat_with_model(&[("k", &SmtSort::Real)])?;
        assert_eq!(result, SatResult::Sat);
        let model = model.ok_or_else(|| std::io::Error::other("expected model"))?;
        assert_eq!(model.get_real("k"), Some(0.25));
        Ok(())
    }

    #[test]
    fn z3_real_unsat() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("x", &SmtSort::Real)?;
        solver.assert(&SmtTerm::and(vec![
            SmtTerm::var("x").gt(SmtTerm::real(0)),
            SmtTerm::var("x").neg().gt(SmtTerm::real(0)),
        ]))?;
        assert_eq!(solver.check_sat()?, SatResult::Unsat);
        Ok(())
    }

    #[test]
    fn z3_rejects_undeclared_and_missorted_terms() -> TestResult {
        let mut solver = Z3Solver::new();
        assert!(matches!(
            solver.assert(&SmtTerm::var("y").gt(SmtTerm::real(0))),
            Err(Z3Error::UnknownVariable(_))
        ));
        solver.declare_var("p", &SmtSort::Bool)?;
        assert!(solver.assert(&SmtTerm::var("p").add(SmtTerm::real(1)).gt(SmtTerm::real(0))).is_err());
        Ok(())
    }

    #[test]
    fn z3_timeout_configuration_survives_reset() -> TestResult {
        let mut solver = Z3Solver::with_timeout_ms(2000);
        solver.declare_var("x", &SmtSort::Real)?;
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::real(1)))?;
        assert_eq!(solver.check_sat()?, SatResult::Sat);

        solver.reset()?;
        assert!(solver.params.is_some());
        solver.declare_var("x", &SmtSort::Real)?;
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::real(2)))?;
        assert_eq!(solver.check_sat()?, SatResult::Sat);
        Ok(())
    }
}
