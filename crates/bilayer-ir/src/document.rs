//! Raw JSON shapes of a bilayer document.
//!
//! Field names follow the published bilayer format. Every collection is
//! required; unknown fields on records are ignored.

use serde::{Deserialize, Serialize};

use crate::bilayer::{Bilayer, Polarity};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilayerDocument {
    /// State variables.
    #[serde(rename = "Qin")]
    pub qin: Vec<StateEntry>,
    /// Tangents, aligned by position with `qin`.
    #[serde(rename = "Qout")]
    pub qout: Vec<TangentEntry>,
    /// Flux terms.
    #[serde(rename = "Box")]
    pub boxes: Vec<FluxEntry>,
    /// State → flux edges.
    #[serde(rename = "Win")]
    pub win: Vec<InputEdgeEntry>,
    /// Flux → tangent edges that add.
    #[serde(rename = "Wa")]
    pub wa: Vec<PositiveEdgeEntry>,
    /// Flux → tangent edges that subtract.
    #[serde(rename = "Wn")]
    pub wn: Vec<NegativeEdgeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub variable: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TangentEntry {
    pub tanvar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluxEntry {
    pub parameter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEdgeEntry {
    /// State index.
    pub arg: usize,
    /// Flux index.
    pub call: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositiveEdgeEntry {
    /// Flux index.
    pub influx: usize,
    /// Tangent index.
    pub infusion: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeEdgeEntry {
    /// Flux index.
    pub efflux: usize,
    /// Tangent index.
    pub effusion: usize,
}

impl Bilayer {
    /// Convert back into document form.
    ///
    /// Positive edges go to `Wa` and negative edges to `Wn`, each keeping its
    /// relative order. For a graph produced by the loader, loading the result
    /// yields an equal graph.
    pub fn to_document(&self) -> BilayerDocument {
        let mut doc = BilayerDocument {
            qin: self
                .states()
                .iter()
                .map(|s| StateEntry {
                    variable: s.parameter.clone(),
                })
                .collect(),
            qout: self
                .tangents()
                .iter()
                .map(|t| TangentEntry {
                    tanvar: t.parameter.clone(),
                })
                .collect(),
            boxes: self
                .fluxes()
                .iter()
                .map(|f| FluxEntry {
                    parameter: f.parameter.clone(),
                })
                .collect(),
            win: self
                .input_edges()
                .iter()
                .map(|e| InputEdgeEntry {
                    arg: e.src,
                    call: e.tgt,
                })
                .collect(),
            wa: Vec::new(),
            wn: Vec::new(),
        };
        for edge in self.output_edges() {
            match edge.polarity {
                Polarity::Positive => doc.wa.push(PositiveEdgeEntry {
                    influx: edge.src,
                    infusion: edge.tgt,
                }),
                Polarity::Negative => doc.wn.push(NegativeEdgeEntry {
                    efflux: edge.src,
                    effusion: edge.tgt,
                }),
            }
        }
        doc
    }
}

impl From<Bilayer> for BilayerDocument {
    fn from(bilayer: Bilayer) -> Self {
        bilayer.to_document()
    }
}
