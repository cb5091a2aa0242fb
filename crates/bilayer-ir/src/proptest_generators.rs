//! Proptest strategies for generating well-formed `Bilayer` graphs.

use proptest::prelude::*;

use crate::bilayer::{Bilayer, Polarity};

/// Strategy for a well-formed `Bilayer` suitable for property testing.
///
/// Generated graphs have:
/// - 1–4 state variables `x1..`, each with a tangent `x1dot..` at the same index
/// - 0–4 fluxes `k1..`
/// - 0–6 input edges and 0–6 output edges between existing nodes
pub fn arb_bilayer() -> impl Strategy<Value = Bilayer> {
    (1..=4usize, 0..=4usize)
        .prop_flat_map(|(nvars, nfluxes)| {
            let (inputs, outputs) = if nfluxes == 0 {
                (
                    proptest::collection::vec((Just(1usize), Just(1usize)), 0..=0).boxed(),
                    proptest::collection::vec((Just(1usize), Just(1usize), any::<bool>()), 0..=0)
                        .boxed(),
                )
            } else {
                (
                    proptest::collection::vec((1..=nvars, 1..=nfluxes), 0..=6).boxed(),
                    proptest::collection::vec((1..=nfluxes, 1..=nvars, any::<bool>()), 0..=6)
                        .boxed(),
                )
            };
            (Just(nvars), Just(nfluxes), inputs, outputs)
        })
        .prop_map(|(nvars, nfluxes, inputs, outputs)| {
            let mut b = Bilayer::new();
            for i in 1..=nvars {
                b.add_state(format!("x{i}"));
                b.add_tangent(format!("x{i}dot"));
            }
            for j in 1..=nfluxes {
                b.add_flux(format!("k{j}"));
            }
            for (src, tgt) in inputs {
                b.add_input_edge(src, tgt)
                    .expect("generated input edge endpoints exist");
            }
            // Keep the loader's ordering: positive edges first.
            let (positive, negative): (Vec<_>, Vec<_>) =
                outputs.into_iter().partition(|(_, _, positive)| *positive);
            for (src, tgt, _) in positive {
                b.add_output_edge(src, tgt, Polarity::Positive)
                    .expect("generated output edge endpoints exist");
            }
            for (src, tgt, _) in negative {
                b.add_output_edge(src, tgt, Polarity::Negative)
                    .expect("generated output edge endpoints exist");
            }
            b
        })
}
