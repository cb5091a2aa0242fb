//! Forward-Euler encoding of a bilayer graph.
//!
//! For each timepoint `t` and each state `x` with tangent `x'` at the same
//! index, the encoder emits
//!
//! ```text
//! x_{t+1} == x_t + Σ positive flux terms − Σ negative flux terms
//! ```
//!
//! A flux term is the flux rate at `t` multiplied, left to right, by every
//! state feeding that flux at `t`. Output edges are visited in declaration
//! order; an edge contributes once per occurrence, so duplicated edges count
//! twice.

pub mod variables;

use bilayer_ir::bilayer::{Bilayer, IndexMismatch, Polarity};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::simplify::simplify;
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

pub use variables::{split_timed_var, timed_var, SymbolTable};

/// A discrete time index.
pub type Timepoint = i64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("model has no tangent nodes; there is nothing to encode")]
    EmptyModel,
    #[error(transparent)]
    IndexMismatch(#[from] IndexMismatch),
    #[error("timepoint {0} has no successor")]
    TimepointOverflow(Timepoint),
}

/// Knobs for [`encode`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderOptions {
    /// Run the algebraic simplifier over every emitted equation.
    pub simplify: bool,
    /// Also bind each tangent symbol to its derivative:
    /// `x'_t == Σ positive − Σ negative`.
    pub tangent_definitions: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            simplify: true,
            tangent_definitions: false,
        }
    }
}

/// Declarations and equations of an encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct BilayerEncoding {
    /// Variable declarations `(name, sort)` in first-use order.
    pub declarations: Vec<(String, SmtSort)>,
    /// Update equations, one group of N per requested timepoint.
    pub updates: Vec<(Timepoint, Vec<SmtTerm>)>,
    /// Tangent definitions, empty unless requested.
    pub tangent_definitions: Vec<SmtTerm>,
    /// Timepoints in the order they were requested.
    pub timepoints: Vec<Timepoint>,
}

impl BilayerEncoding {
    /// Number of update equations: timepoints × state variables.
    pub fn equation_count(&self) -> usize {
        self.updates.iter().map(|(_, eqs)| eqs.len()).sum()
    }

    /// Update equations in emission order.
    pub fn equations(&self) -> impl Iterator<Item = &SmtTerm> {
        self.updates.iter().flat_map(|(_, eqs)| eqs.iter())
    }

    /// Conjunction of every update equation followed by the tangent
    /// definitions.
    pub fn formula(&self) -> SmtTerm {
        SmtTerm::and(
            self.equations()
                .chain(self.tangent_definitions.iter())
                .cloned()
                .collect(),
        )
    }
}

/// One signed product contributing to a tangent.
#[derive(Debug, Clone)]
struct FluxTerm<'a> {
    rate: &'a str,
    inputs: Vec<&'a str>,
    polarity: Polarity,
}

/// Everything needed to emit the update of one state, independent of time.
#[derive(Debug, Clone)]
struct UpdatePlan<'a> {
    state: &'a str,
    tangent: &'a str,
    terms: Vec<FluxTerm<'a>>,
}

fn plan(bilayer: &Bilayer) -> Result<Vec<UpdatePlan<'_>>, EncodeError> {
    if bilayer.tangents().is_empty() {
        return Err(EncodeError::EmptyModel);
    }
    let variables = bilayer.variables()?;

    let plans = variables
        .into_iter()
        .map(|var| {
            // Edge endpoints are checked when the graph is built.
            let terms = bilayer
                .edges_into_tangent(var.tangent.index)
                .filter_map(|edge| {
                    let flux = bilayer.flux(edge.src)?;
                    let inputs = bilayer
                        .edges_into_flux(flux.index)
                        .filter_map(|input| bilayer.state(input.src))
                        .map(|state| state.parameter.as_str())
                        .collect();
                    Some(FluxTerm {
                        rate: flux.parameter.as_str(),
                        inputs,
                        polarity: edge.polarity,
                    })
                })
                .collect();
            UpdatePlan {
                state: var.state.parameter.as_str(),
                tangent: var.tangent.parameter.as_str(),
                terms,
            }
        })
        .collect();
    Ok(plans)
}

impl UpdatePlan<'_> {
    fn derivative(&self, t: Timepoint, symbols: &mut SymbolTable) -> Option<SmtTerm> {
        let mut sum: Option<SmtTerm> = None;
        for term in &self.terms {
            let product = term
                .inputs
                .iter()
                .fold(symbols.symbol_for(term.rate, t), |acc, input| {
                    acc.mul(symbols.symbol_for(input, t))
                });
            sum = Some(match (sum, term.polarity) {
                (None, Polarity::Positive) => product,
                (None, Polarity::Negative) => product.neg(),
                (Some(acc), Polarity::Positive) => acc.add(product),
                (Some(acc), Polarity::Negative) => acc.sub(product),
            });
        }
        sum
    }
}

/// Encode the forward-Euler updates of `bilayer` at each of `timepoints`.
///
/// Timepoints are encoded in the given order; duplicates are encoded again.
pub fn encode(
    bilayer: &Bilayer,
    timepoints: &[Timepoint],
    options: &EncoderOptions,
) -> Result<BilayerEncoding, EncodeError> {
    let plans = plan(bilayer)?;
    let mut symbols = SymbolTable::new();
    let mut updates = Vec::with_capacity(timepoints.len());
    let mut tangent_definitions = Vec::new();

    let finish = |term: SmtTerm| {
        if options.simplify {
            simplify(&term)
        } else {
            term
        }
    };

    for &t in timepoints {
        let next = t.checked_add(1).ok_or(EncodeError::TimepointOverflow(t))?;
        let mut equations = Vec::with_capacity(plans.len());
        for plan in &plans {
            let now = symbols.symbol_for(plan.state, t);
            let after = symbols.symbol_for(plan.state, next);
            let derivative = plan.derivative(t, &mut symbols);

            if options.tangent_definitions {
                let tangent = symbols.symbol_for(plan.tangent, t);
                let rhs = derivative.clone().unwrap_or(SmtTerm::real(0));
                tangent_definitions.push(finish(tangent.eq(rhs)));
            }

            let rhs = match derivative {
                Some(d) => now.add(d),
                None => now,
            };
            equations.push(finish(after.eq(rhs)));
        }
        updates.push((t, equations));
    }

    let encoding = BilayerEncoding {
        declarations: symbols.declarations(),
        updates,
        tangent_definitions,
        timepoints: timepoints.to_vec(),
    };
    debug!(
        timepoints = timepoints.len(),
        equations = encoding.equation_count(),
        symbols = encoding.declarations.len(),
        "encoded bilayer"
    );
    Ok(encoding)
}

/// Conjunction of the update equations at every timepoint, with default
/// options.
pub fn build_constraints(
    bilayer: &Bilayer,
    timepoints: &[Timepoint],
) -> Result<SmtTerm, EncodeError> {
    Ok(encode(bilayer, timepoints, &EncoderOptions::default())?.formula())
}

/// Conjunction of the N update equations at timepoint `t`.
pub fn build_timepoint(bilayer: &Bilayer, t: Timepoint) -> Result<SmtTerm, EncodeError> {
    build_constraints(bilayer, &[t])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decay() -> Bilayer {
        let mut b = Bilayer::new();
        let x = b.add_state("x");
        let dx = b.add_tangent("dx");
        let k = b.add_flux("k");
        b.add_input_edge(x, k).unwrap();
        b.add_output_edge(k, dx, Polarity::Negative).unwrap();
        b
    }

    #[test]
    fn single_negative_flux_becomes_subtraction() {
        let formula = build_timepoint(&decay(), 3).unwrap();
        let expected = SmtTerm::var("x_4").eq(
            SmtTerm::var("x_3").sub(SmtTerm::var("k_3").mul(SmtTerm::var("x_3"))),
        );
        assert_eq!(formula, SmtTerm::and(vec![expected]));
    }

    #[test]
    fn unsimplified_output_keeps_negation() {
        let options = EncoderOptions {
            simplify: false,
            ..EncoderOptions::default()
        };
        let enc = encode(&decay(), &[0], &options).unwrap();
        let expected = SmtTerm::var("x_1").eq(
            SmtTerm::var("x_0").add(SmtTerm::var("k_0").mul(SmtTerm::var("x_0")).neg()),
        );
        assert_eq!(enc.equations().collect::<Vec<_>>(), vec![&expected]);
    }

    #[test]
    fn empty_tangent_layer_is_rejected_before_alignment() {
        let mut b = Bilayer::new();
        b.add_state("x");
        assert_eq!(build_timepoint(&b, 0), Err(EncodeError::EmptyModel));
    }

    #[test]
    fn misaligned_layers_are_rejected() {
        let mut b = Bilayer::new();
        b.add_state("x");
        b.add_state("y");
        b.add_tangent("dx");
        assert_eq!(
            build_timepoint(&b, 0),
            Err(EncodeError::IndexMismatch(IndexMismatch {
                states: 2,
                tangents: 1
            }))
        );
    }

    #[test]
    fn last_timepoint_overflows() {
        assert_eq!(
            build_timepoint(&decay(), Timepoint::MAX),
            Err(EncodeError::TimepointOverflow(Timepoint::MAX))
        );
    }

    #[test]
    fn tangent_definitions_bind_derivative_symbols() {
        let mut b = decay();
        b.add_state("y");
        b.add_tangent("dy");
        let options = EncoderOptions {
            tangent_definitions: true,
            ..EncoderOptions::default()
        };
        let enc = encode(&b, &[0], &options).unwrap();
        assert_eq!(enc.equation_count(), 2);
        assert_eq!(
            enc.tangent_definitions,
            vec![
                SmtTerm::var("dx_0").eq(SmtTerm::var("k_0").mul(SmtTerm::var("x_0")).neg()),
                SmtTerm::var("dy_0").eq(SmtTerm::real(0)),
            ]
        );
        assert_eq!(enc.formula().count_equalities(), 4);
    }

    #[test]
    fn declarations_are_real_and_in_first_use_order() {
        let enc = encode(&decay(), &[0, 1], &EncoderOptions::default()).unwrap();
        let names: Vec<_> = enc.declarations.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["x_0", "x_1", "k_0", "x_2", "k_1"]);
        assert!(enc.declarations.iter().all(|(_, s)| *s == SmtSort::Real));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: EncoderOptions = serde_json::from_str(r#"{"tangent_definitions": true}"#).unwrap();
        assert!(opts.simplify);
        assert!(opts.tangent_definitions);
        assert!(serde_json::from_str::<EncoderOptions>(r#"{"simplfy": true}"#).is_err());
    }
}
