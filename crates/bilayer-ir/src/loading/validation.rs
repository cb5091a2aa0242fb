//! Name checks, structural warnings and span lookup for load diagnostics.

use indexmap::IndexMap;
use miette::SourceSpan;
use tracing::warn;

use crate::bilayer::{Bilayer, NodeKind};

use super::LoadError;

pub(super) fn check_name(
    collection: &'static str,
    entry: usize,
    name: &str,
) -> Result<(), LoadError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains('|') {
        "name contains '|'"
    } else if name.contains('\\') {
        "name contains '\\'"
    } else {
        return Ok(());
    };
    Err(LoadError::InvalidName {
        collection,
        entry,
        name: name.to_string(),
        reason,
    })
}

/// Report structure that loads fine but is likely a modeling mistake.
pub(super) fn warn_on_suspicious_structure(bilayer: &Bilayer) {
    let states = bilayer.states().len();
    let tangents = bilayer.tangents().len();
    if states != tangents {
        warn!(
            states,
            tangents, "state and tangent layers differ in length; encoding will be refused"
        );
    }

    for clash in name_clashes(bilayer) {
        if clash.first == NodeKind::State && clash.second == NodeKind::State {
            warn!(name = clash.name, "duplicate state variable name; both share one symbol per timepoint");
        } else {
            warn!(
                name = clash.name,
                first = %clash.first,
                second = %clash.second,
                "node name already in use; both share one symbol per timepoint"
            );
        }
    }

    for flux in bilayer.fluxes() {
        if bilayer.edges_into_flux(flux.index).next().is_none() {
            warn!(
                name = %flux.parameter,
                "flux has no input edges; its term is the bare rate"
            );
        }
    }
}

/// A node whose name was already taken by an earlier node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct NameClash<'a> {
    pub name: &'a str,
    /// Kind of the node that claimed the name first.
    pub first: NodeKind,
    pub second: NodeKind,
}

/// Names that render to the same symbol, visiting states, then tangents,
/// then fluxes.
pub(super) fn name_clashes(bilayer: &Bilayer) -> Vec<NameClash<'_>> {
    let nodes = bilayer
        .states()
        .iter()
        .map(|s| (s.parameter.as_str(), NodeKind::State))
        .chain(
            bilayer
                .tangents()
                .iter()
                .map(|t| (t.parameter.as_str(), NodeKind::Tangent)),
        )
        .chain(
            bilayer
                .fluxes()
                .iter()
                .map(|f| (f.parameter.as_str(), NodeKind::Flux)),
        );

    let mut seen: IndexMap<&str, NodeKind> = IndexMap::new();
    let mut clashes = Vec::new();
    for (name, kind) in nodes {
        match seen.get(name) {
            Some(&first) => clashes.push(NameClash {
                name,
                first,
                second: kind,
            }),
            None => {
                seen.insert(name, kind);
            }
        }
    }
    clashes
}

/// Best-effort span lookup for a load error by examining the source text.
pub(super) fn find_span_for_error(err: &LoadError, source: &str) -> Option<SourceSpan> {
    match err {
        LoadError::Malformed { line, column, .. } => {
            let offset = offset_of(source, *line, *column)?;
            Some(SourceSpan::new(offset.into(), 1))
        }
        LoadError::DanglingReference { collection, .. }
        | LoadError::InvalidName { collection, .. } => {
            let key = format!("\"{collection}\"");
            let start = source.find(&key)?;
            Some(SourceSpan::new(start.into(), key.len()))
        }
        LoadError::Io { .. } => None,
    }
}

/// Byte offset of a 1-based (line, column) position, clamped to the line.
fn offset_of(source: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let mut start = 0;
    for (i, text) in source.split_inclusive('\n').enumerate() {
        if i + 1 == line {
            let col = column.saturating_sub(1).min(text.len().saturating_sub(1));
            let mut offset = start + col;
            while !source.is_char_boundary(offset) {
                offset -= 1;
            }
            return Some(offset);
        }
        start += text.len();
    }
    None
}
