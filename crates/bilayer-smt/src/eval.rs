//! Evaluation of terms under a concrete real-valued assignment.
//!
//! Used to check simulated or observed trajectories against an encoding.
//! Equality and ordering on reals use a relative tolerance of
//! [`REAL_EQ_TOLERANCE`] so that differently associated sums still compare
//! equal.

use std::collections::HashMap;

use thiserror::Error;

use crate::terms::SmtTerm;

pub const REAL_EQ_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Real(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Unbound variable: {0}")]
    Unbound(String),
    #[error("Expected {expected} value in {context}")]
    SortMismatch {
        expected: &'static str,
        context: &'static str,
    },
}

/// Evaluate `term` with every variable looked up in `env`.
pub fn eval(term: &SmtTerm, env: &HashMap<String, f64>) -> Result<Value, EvalError> {
    match term {
        SmtTerm::Var(name) => env
            .get(name)
            .map(|v| Value::Real(*v))
            .ok_or_else(|| EvalError::Unbound(name.clone())),
        SmtTerm::IntLit(n) | SmtTerm::RealLit(n) => Ok(Value::Real(*n as f64)),
        SmtTerm::BoolLit(b) => Ok(Value::Bool(*b)),
        SmtTerm::Add(lhs, rhs) => Ok(Value::Real(real(lhs, env, "+")? + real(rhs, env, "+")?)),
        SmtTerm::Sub(lhs, rhs) => Ok(Value::Real(real(lhs, env, "-")? - real(rhs, env, "-")?)),
        SmtTerm::Mul(lhs, rhs) => Ok(Value::Real(real(lhs, env, "*")? * real(rhs, env, "*")?)),
        SmtTerm::Neg(inner) => Ok(Value::Real(-real(inner, env, "negation")?)),
        SmtTerm::Eq(lhs, rhs) => match (eval(lhs, env)?, eval(rhs, env)?) {
            (Value::Real(l), Value::Real(r)) => Ok(Value::Bool(approx_eq(l, r))),
            (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(l == r)),
            _ => Err(EvalError::SortMismatch {
                expected: "matching",
                context: "=",
            }),
        },
        SmtTerm::Lt(lhs, rhs) => {
            let (l, r) = (real(lhs, env, "<")?, real(rhs, env, "<")?);
            Ok(Value::Bool(l < r && !approx_eq(l, r)))
        }
        SmtTerm::Le(lhs, rhs) => {
            let (l, r) = (real(lhs, env, "<=")?, real(rhs, env, "<=")?);
            Ok(Value::Bool(l <= r || approx_eq(l, r)))
        }
        SmtTerm::Gt(lhs, rhs) => {
            let (l, r) = (real(lhs, env, ">")?, real(rhs, env, ">")?);
            Ok(Value::Bool(l > r && !approx_eq(l, r)))
        }
        SmtTerm::Ge(lhs, rhs) => {
            let (l, r) = (real(lhs, env, ">=")?, real(rhs, env, ">=")?);
            Ok(Value::Bool(l >= r || approx_eq(l, r)))
        }
        SmtTerm::And(terms) => {
            for t in terms {
                if !boolean(t, env, "and")? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        SmtTerm::Or(terms) => {
            for t in terms {
                if boolean(t, env, "or")? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        SmtTerm::Not(inner) => Ok(Value::Bool(!boolean(inner, env, "not")?)),
        SmtTerm::Implies(lhs, rhs) => Ok(Value::Bool(
            !boolean(lhs, env, "=>")? || boolean(rhs, env, "=>")?,
        )),
        SmtTerm::Ite(cond, then, els) => {
            if boolean(cond, env, "ite")? {
                eval(then, env)
            } else {
                eval(els, env)
            }
        }
    }
}

pub fn eval_real(term: &SmtTerm, env: &HashMap<String, f64>) -> Result<f64, EvalError> {
    real(term, env, "term")
}

pub fn eval_bool(term: &SmtTerm, env: &HashMap<String, f64>) -> Result<bool, EvalError> {
    boolean(term, env, "term")
}

fn real(term: &SmtTerm, env: &HashMap<String, f64>, context: &'static str) -> Result<f64, EvalError> {
    match eval(term, env)? {
        Value::Real(v) => Ok(v),
        Value::Bool(_) => Err(EvalError::SortMismatch {
            expected: "Real",
            context,
        }),
    }
}

fn boolean(
    term: &SmtTerm,
    env: &HashMap<String, f64>,
    context: &'static str,
) -> Result<bool, EvalError> {
    match eval(term, env)? {
        Value::Bool(b) => Ok(b),
        Value::Real(_) => Err(EvalError::SortMismatch {
            expected: "Bool",
            context,
        }),
    }
}

fn approx_eq(l: f64, r: f64) -> bool {
    let scale = 1.0_f64.max(l.abs()).max(r.abs());
    (l - r).abs() <= REAL_EQ_TOLERANCE * scale
}
