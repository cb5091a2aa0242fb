//! Property tests: encodings agree with a direct forward-Euler simulation,
//! and simplification preserves meaning.

use std::collections::HashMap;

use bilayer_ir::bilayer::{Bilayer, Polarity};
use bilayer_ir::proptest_generators::arb_bilayer;
use bilayer_smt::encoder::{encode, timed_var, EncoderOptions};
use bilayer_smt::eval::{eval_bool, eval_real};
use bilayer_smt::simplify::simplify;
use bilayer_smt::terms::SmtTerm;
use proptest::prelude::*;

/// Step the model forward from `initial`, recording every state and rate
/// symbol the encoding can mention.
fn simulate(bilayer: &Bilayer, initial: &[f64], rates: &[f64], steps: i64) -> HashMap<String, f64> {
    let mut env = HashMap::new();
    let mut current = initial.to_vec();
    for t in 0..steps {
        for (state, value) in bilayer.states().iter().zip(&current) {
            env.insert(timed_var(&state.parameter, t), *value);
        }
        for (flux, rate) in bilayer.fluxes().iter().zip(rates) {
            env.insert(timed_var(&flux.parameter, t), *rate);
        }

        let flux_value = |flux: usize| -> f64 {
            bilayer
                .input_edges()
                .iter()
                .filter(|e| e.tgt == flux)
                .fold(rates[flux - 1], |acc, e| acc * current[e.src - 1])
        };
        let mut next = current.clone();
        for edge in bilayer.output_edges() {
            let delta = flux_value(edge.src);
            match edge.polarity {
                Polarity::Positive => next[edge.tgt - 1] += delta,
                Polarity::Negative => next[edge.tgt - 1] -= delta,
            }
        }
        current = next;
    }
    for (state, value) in bilayer.states().iter().zip(&current) {
        env.insert(timed_var(&state.parameter, steps), *value);
    }
    env
}

fn arb_model_with_values() -> impl Strategy<Value = (Bilayer, Vec<f64>, Vec<f64>)> {
    arb_bilayer().prop_flat_map(|b| {
        let n = b.states().len();
        let m = b.fluxes().len();
        (
            Just(b),
            proptest::collection::vec(0.0f64..1.0, n),
            proptest::collection::vec(0.0f64..0.5, m),
        )
    })
}

/// Integer-valued arithmetic over a, b, c, so evaluation is exact.
fn arb_arith() -> impl Strategy<Value = SmtTerm> {
    let leaf = prop_oneof![
        prop::sample::select(vec!["a", "b", "c"]).prop_map(SmtTerm::var),
        (-3i64..=3).prop_map(SmtTerm::real),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.add(r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.sub(r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.mul(r)),
            inner.prop_map(SmtTerm::neg),
        ]
    })
}

fn arb_formula() -> impl Strategy<Value = SmtTerm> {
    let atom = prop_oneof![
        (arb_arith(), arb_arith()).prop_map(|(l, r)| l.eq(r)),
        (arb_arith(), arb_arith()).prop_map(|(l, r)| l.lt(r)),
        (arb_arith(), arb_arith()).prop_map(|(l, r)| l.ge(r)),
        any::<bool>().prop_map(SmtTerm::bool),
    ];
    atom.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..3).prop_map(SmtTerm::and),
            proptest::collection::vec(inner.clone(), 0..3).prop_map(SmtTerm::or),
            inner.clone().prop_map(SmtTerm::not),
            (inner.clone(), inner).prop_map(|(l, r)| l.implies(r)),
        ]
    })
}

fn arb_env() -> impl Strategy<Value = HashMap<String, f64>> {
    (-5i64..=5, -5i64..=5, -5i64..=5).prop_map(|(a, b, c)| {
        [("a", a), ("b", b), ("c", c)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v as f64))
            .collect()
    })
}

proptest! {
    #[test]
    fn simulated_trajectory_satisfies_encoding(
        (b, initial, rates) in arb_model_with_values(),
        steps in 1i64..4,
        simplify_output in any::<bool>(),
    ) {
        let timepoints: Vec<i64> = (0..steps).collect();
        let options = EncoderOptions { simplify: simplify_output, ..EncoderOptions::default() };
        let enc = encode(&b, &timepoints, &options).unwrap();
        let env = simulate(&b, &initial, &rates, steps);
        prop_assert_eq!(eval_bool(&enc.formula(), &env), Ok(true));
    }

    #[test]
    fn perturbed_successor_violates_encoding(
        (b, initial, rates) in arb_model_with_values(),
    ) {
        let enc = encode(&b, &[0], &EncoderOptions::default()).unwrap();
        let mut env = simulate(&b, &initial, &rates, 1);
        let first = timed_var(&b.states()[0].parameter, 1);
        if let Some(v) = env.get_mut(&first) {
            *v += 1.0;
        }
        prop_assert_eq!(eval_bool(&enc.formula(), &env), Ok(false));
    }

    #[test]
    fn encoding_is_deterministic(b in arb_bilayer(), t in -100i64..100) {
        let options = EncoderOptions::default();
        prop_assert_eq!(
            encode(&b, &[t, t + 1], &options).unwrap(),
            encode(&b, &[t, t + 1], &options).unwrap()
        );
    }

    #[test]
    fn equation_count_matches_timepoints_times_states(
        b in arb_bilayer(),
        timepoints in proptest::collection::vec(-10i64..10, 0..6),
    ) {
        let enc = encode(&b, &timepoints, &EncoderOptions::default()).unwrap();
        prop_assert_eq!(enc.equation_count(), timepoints.len() * b.states().len());
        prop_assert_eq!(enc.formula().count_equalities(), enc.equation_count());
    }

    #[test]
    fn simplify_preserves_arithmetic_value(term in arb_arith(), env in arb_env()) {
        prop_assert_eq!(eval_real(&simplify(&term), &env), eval_real(&term, &env));
    }

    #[test]
    fn simplify_preserves_truth(formula in arb_formula(), env in arb_env()) {
        prop_assert_eq!(eval_bool(&simplify(&formula), &env), eval_bool(&formula, &env));
    }
}
