use std::fmt;

use thiserror::Error;

/// 1-based index of a state (input-layer) node.
pub type StateId = usize;
/// 1-based index of a tangent (derivative) node.
pub type TangentId = usize;
/// 1-based index of a flux node.
pub type FluxId = usize;

/// A state variable: a population or compartment quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StateNode {
    pub index: StateId,
    pub parameter: String,
}

/// The time-derivative of the state at the same index.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TangentNode {
    pub index: TangentId,
    pub parameter: String,
}

/// A named rate term.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct FluxNode {
    pub index: FluxId,
    pub parameter: String,
}

/// Sign of a flux contribution to a tangent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Polarity {
    Positive,
    Negative,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Positive => write!(f, "positive"),
            Polarity::Negative => write!(f, "negative"),
        }
    }
}

/// State `src` participates multiplicatively in flux `tgt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct InputEdge {
    pub src: StateId,
    pub tgt: FluxId,
}

/// Flux `src` contributes to tangent `tgt` with the given polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputEdge {
    pub src: FluxId,
    pub tgt: TangentId,
    pub polarity: Polarity,
}

/// Which node collection an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    State,
    Tangent,
    Flux,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::State => write!(f, "state"),
            NodeKind::Tangent => write!(f, "tangent"),
            NodeKind::Flux => write!(f, "flux"),
        }
    }
}

/// An edge endpoint that does not name an existing node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} index {index} does not exist (valid range 1..={available})")]
pub struct DanglingReference {
    pub kind: NodeKind,
    pub index: usize,
    pub available: usize,
}

/// State and tangent layers have different lengths, so derivatives cannot be
/// paired with their states by position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{states} state variables but {tangents} tangents; each state needs exactly one tangent at the same index")]
pub struct IndexMismatch {
    pub states: usize,
    pub tangents: usize,
}

/// A state variable paired with its declared derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable<'a> {
    pub state: &'a StateNode,
    pub tangent: &'a TangentNode,
}

/// A bilayer graph.
///
/// Nodes live in three index-addressed collections; edges refer to them by
/// 1-based index. Nodes and edges can only be appended, and an edge is only
/// accepted when both endpoints already exist.
///
/// With the `serialize` feature a graph (de)serializes in document form, and
/// deserializing goes through the loader, so the same checks apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize),
    serde(
        try_from = "crate::document::BilayerDocument",
        into = "crate::document::BilayerDocument"
    )
)]
pub struct Bilayer {
    states: Vec<StateNode>,
    tangents: Vec<TangentNode>,
    fluxes: Vec<FluxNode>,
    input_edges: Vec<InputEdge>,
    output_edges: Vec<OutputEdge>,
}

impl Bilayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self, parameter: impl Into<String>) -> StateId {
        let index = self.states.len() + 1;
        self.states.push(StateNode {
            index,
            parameter: parameter.into(),
        });
        index
    }

    pub fn add_tangent(&mut self, parameter: impl Into<String>) -> TangentId {
        let index = self.tangents.len() + 1;
        self.tangents.push(TangentNode {
            index,
            parameter: parameter.into(),
        });
        index
    }

    pub fn add_flux(&mut self, parameter: impl Into<String>) -> FluxId {
        let index = self.fluxes.len() + 1;
        self.fluxes.push(FluxNode {
            index,
            parameter: parameter.into(),
        });
        index
    }

    pub fn add_input_edge(&mut self, src: StateId, tgt: FluxId) -> Result<(), DanglingReference> {
        check_index(NodeKind::State, src, self.states.len())?;
        check_index(NodeKind::Flux, tgt, self.fluxes.len())?;
        self.input_edges.push(InputEdge { src, tgt });
        Ok(())
    }

    pub fn add_output_edge(
        &mut self,
        src: FluxId,
        tgt: TangentId,
        polarity: Polarity,
    ) -> Result<(), DanglingReference> {
        check_index(NodeKind::Flux, src, self.fluxes.len())?;
        check_index(NodeKind::Tangent, tgt, self.tangents.len())?;
        self.output_edges.push(OutputEdge { src, tgt, polarity });
        Ok(())
    }

    pub fn states(&self) -> &[StateNode] {
        &self.states
    }

    pub fn tangents(&self) -> &[TangentNode] {
        &self.tangents
    }

    pub fn fluxes(&self) -> &[FluxNode] {
        &self.fluxes
    }

    pub fn input_edges(&self) -> &[InputEdge] {
        &self.input_edges
    }

    /// Output edges in load order: all positive (`Wa`) edges, then all
    /// negative (`Wn`) edges.
    pub fn output_edges(&self) -> &[OutputEdge] {
        &self.output_edges
    }

    pub fn state(&self, id: StateId) -> Option<&StateNode> {
        id.checked_sub(1).and_then(|i| self.states.get(i))
    }

    pub fn tangent(&self, id: TangentId) -> Option<&TangentNode> {
        id.checked_sub(1).and_then(|i| self.tangents.get(i))
    }

    pub fn flux(&self, id: FluxId) -> Option<&FluxNode> {
        id.checked_sub(1).and_then(|i| self.fluxes.get(i))
    }

    pub fn state_by_name(&self, parameter: &str) -> Option<&StateNode> {
        self.states.iter().find(|s| s.parameter == parameter)
    }

    pub fn tangent_by_name(&self, parameter: &str) -> Option<&TangentNode> {
        self.tangents.iter().find(|t| t.parameter == parameter)
    }

    pub fn flux_by_name(&self, parameter: &str) -> Option<&FluxNode> {
        self.fluxes.iter().find(|f| f.parameter == parameter)
    }

    /// Output edges that target `tangent`, in declaration order.
    pub fn edges_into_tangent(&self, tangent: TangentId) -> impl Iterator<Item = &OutputEdge> {
        self.output_edges.iter().filter(move |e| e.tgt == tangent)
    }

    /// Input edges that feed `flux`, in declaration order.
    pub fn edges_into_flux(&self, flux: FluxId) -> impl Iterator<Item = &InputEdge> {
        self.input_edges.iter().filter(move |e| e.tgt == flux)
    }

    /// Pair every state with the tangent at the same index.
    ///
    /// Fails when the two layers differ in length, since the pairing is
    /// positional.
    pub fn variables(&self) -> Result<Vec<Variable<'_>>, IndexMismatch> {
        if self.states.len() != self.tangents.len() {
            return Err(IndexMismatch {
                states: self.states.len(),
                tangents: self.tangents.len(),
            });
        }
        Ok(self
            .states
            .iter()
            .zip(&self.tangents)
            .map(|(state, tangent)| Variable { state, tangent })
            .collect())
    }
}

fn check_index(kind: NodeKind, index: usize, available: usize) -> Result<(), DanglingReference> {
    if index == 0 || index > available {
        return Err(DanglingReference {
            kind,
            index,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sir() -> Bilayer {
        let mut b = Bilayer::new();
        let s = b.add_state("S");
        let i = b.add_state("I");
        b.add_state("R");
        let sdot = b.add_tangent("Sdot");
        let idot = b.add_tangent("Idot");
        let rdot = b.add_tangent("Rdot");
        let inf = b.add_flux("inf");
        let rec = b.add_flux("rec");
        b.add_input_edge(s, inf).unwrap();
        b.add_input_edge(i, inf).unwrap();
        b.add_input_edge(i, rec).unwrap();
        b.add_output_edge(inf, idot, Polarity::Positive).unwrap();
        b.add_output_edge(rec, rdot, Polarity::Positive).unwrap();
        b.add_output_edge(inf, sdot, Polarity::Negative).unwrap();
        b.add_output_edge(rec, idot, Polarity::Negative).unwrap();
        b
    }

    #[test]
    fn indices_are_one_based_and_dense() {
        let b = sir();
        let ids: Vec<_> = b.states().iter().map(|s| s.index).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(b.state(1).map(|s| s.parameter.as_str()), Some("S"));
        assert!(b.state(0).is_none());
        assert!(b.state(4).is_none());
        assert_eq!(b.flux(2).map(|f| f.parameter.as_str()), Some("rec"));
    }

    #[test]
    fn edge_with_missing_endpoint_is_rejected() {
        let mut b = Bilayer::new();
        b.add_state("S");
        b.add_flux("beta");
        let err = b.add_input_edge(2, 1).unwrap_err();
        assert_eq!(
            err,
            DanglingReference {
                kind: NodeKind::State,
                index: 2,
                available: 1
            }
        );
        let err = b.add_output_edge(1, 1, Polarity::Positive).unwrap_err();
        assert_eq!(err.kind, NodeKind::Tangent);
        assert!(b.output_edges().is_empty());
    }

    #[test]
    fn adjacency_follows_declaration_order() {
        let b = sir();
        let into_idot: Vec<_> = b.edges_into_tangent(2).map(|e| (e.src, e.polarity)).collect();
        assert_eq!(into_idot, vec![(1, Polarity::Positive), (2, Polarity::Negative)]);
        let into_inf: Vec<_> = b.edges_into_flux(1).map(|e| e.src).collect();
        assert_eq!(into_inf, vec![1, 2]);
    }

    #[test]
    fn variables_pair_states_with_tangents_by_position() {
        let b = sir();
        let vars = b.variables().unwrap();
        let pairs: Vec<_> = vars
            .iter()
            .map(|v| (v.state.parameter.as_str(), v.tangent.parameter.as_str()))
            .collect();
        assert_eq!(pairs, vec![("S", "Sdot"), ("I", "Idot"), ("R", "Rdot")]);
    }

    #[test]
    fn variables_reject_misaligned_layers() {
        let mut b = Bilayer::new();
        b.add_state("S");
        b.add_state("I");
        b.add_tangent("Sdot");
        assert_eq!(
            b.variables().unwrap_err(),
            IndexMismatch {
                states: 2,
                tangents: 1
            }
        );
    }

    #[test]
    fn lookup_by_name() {
        let b = sir();
        assert_eq!(b.state_by_name("I").map(|s| s.index), Some(2));
        assert_eq!(b.tangent_by_name("Rdot").map(|t| t.index), Some(3));
        assert_eq!(b.flux_by_name("inf").map(|f| f.index), Some(1));
        assert!(b.flux_by_name("gamma").is_none());
    }
}
