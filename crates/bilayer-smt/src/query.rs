//! Checking caller-built queries against an encoding.
//!
//! A query is any boolean `SmtTerm` over the encoding's symbols, for example
//! `I_3 > 0.5` or bounds on a rate. Its variables that the encoding does not
//! declare are declared as reals.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::encoder::BilayerEncoding;
use crate::solver::{Model, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryVerdict {
    /// The query holds. For consistency checks the witness is a satisfying
    /// trajectory.
    Holds { witness: Option<Model> },
    /// The query fails. For entailment checks the witness is a trajectory
    /// violating the query.
    Refuted { witness: Option<Model> },
    Unknown { reason: String },
}

impl QueryVerdict {
    pub fn holds(&self) -> bool {
        matches!(self, QueryVerdict::Holds { .. })
    }

    pub fn witness(&self) -> Option<&Model> {
        match self {
            QueryVerdict::Holds { witness } | QueryVerdict::Refuted { witness } => {
                witness.as_ref()
            }
            QueryVerdict::Unknown { .. } => None,
        }
    }
}

/// Is `encoding ∧ query` satisfiable?
pub fn check_consistency<S: SmtSolver>(
    solver: &mut S,
    encoding: &BilayerEncoding,
    query: &SmtTerm,
) -> Result<QueryVerdict, S::Error> {
    info!("query: checking consistency");
    let (result, model) = solve_with(solver, encoding, query, query.clone())?;
    Ok(match result {
        SatResult::Sat => {
            info!("query: consistent with the model");
            QueryVerdict::Holds { witness: model }
        }
        SatResult::Unsat => {
            info!("query: inconsistent with the model");
            QueryVerdict::Refuted { witness: None }
        }
        SatResult::Unknown(reason) => {
            info!(%reason, "query: unknown result");
            QueryVerdict::Unknown { reason }
        }
    })
}

/// Is `encoding ∧ ¬query` unsatisfiable, i.e. does every trajectory of the
/// encoding satisfy `query`?
pub fn check_entailment<S: SmtSolver>(
    solver: &mut S,
    encoding: &BilayerEncoding,
    query: &SmtTerm,
) -> Result<QueryVerdict, S::Error> {
    info!("query: checking entailment");
    let (result, model) = solve_with(solver, encoding, query, query.clone().not())?;
    Ok(match result {
        SatResult::Sat => {
            info!("query: counterexample found");
            if model.is_none() {
                warn!("query: solver returned SAT without a model");
            }
            QueryVerdict::Refuted { witness: model }
        }
        SatResult::Unsat => {
            info!("query: entailed by the model");
            QueryVerdict::Holds { witness: None }
        }
        SatResult::Unknown(reason) => {
            info!(%reason, "query: unknown result");
            QueryVerdict::Unknown { reason }
        }
    })
}

fn solve_with<S: SmtSolver>(
    solver: &mut S,
    encoding: &BilayerEncoding,
    query: &SmtTerm,
    goal: SmtTerm,
) -> Result<(SatResult, Option<Model>), S::Error> {
    solver.reset()?;

    let mut model_vars: Vec<(String, SmtSort)> = encoding.declarations.clone();
    let declared: HashSet<&str> = encoding
        .declarations
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    for name in query.free_vars() {
        if !declared.contains(name.as_str()) {
            model_vars.push((name, SmtSort::Real));
        }
    }

    for (name, sort) in &model_vars {
        solver.declare_var(name, sort)?;
    }
    for equation in encoding.equations() {
        solver.assert(equation)?;
    }
    for definition in &encoding.tangent_definitions {
        solver.assert(definition)?;
    }
    solver.assert(&goal)?;

    let var_refs: Vec<(&str, &SmtSort)> = model_vars
        .iter()
        .map(|(n, s)| (n.as_str(), s))
        .collect();
    solver.check_sat_with_model(&var_refs)
}
