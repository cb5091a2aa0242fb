mod validation;

use std::io::Read;
use std::path::{Path, PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use tracing::debug;

use crate::bilayer::{Bilayer, DanglingReference, NodeKind, Polarity};
use crate::document::BilayerDocument;

use validation::*;

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("Malformed bilayer document: {message}")]
    #[diagnostic(
        code(bilayer::load::malformed),
        help("a bilayer document needs the sequences Qin, Qout, Box, Win, Wa and Wn")
    )]
    Malformed {
        message: String,
        /// 1-based line of the offending token, 0 when unknown.
        line: usize,
        /// 1-based column of the offending token, 0 when unknown.
        column: usize,
    },

    #[error("{collection}[{entry}].{field}: {reference}")]
    #[diagnostic(code(bilayer::load::dangling_reference))]
    DanglingReference {
        collection: &'static str,
        /// 0-based position of the edge within its collection.
        entry: usize,
        field: &'static str,
        reference: DanglingReference,
    },

    #[error("{collection}[{entry}]: invalid name {name:?}: {reason}")]
    #[diagnostic(
        code(bilayer::load::invalid_name),
        help("names must be non-empty and must not contain '|' or '\\'")
    )]
    InvalidName {
        collection: &'static str,
        entry: usize,
        name: String,
        reason: &'static str,
    },

    #[error("Cannot read {}: {source}", path.display())]
    #[diagnostic(code(bilayer::load::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::Malformed {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

/// A load error enriched with source span information for pretty-printed diagnostics.
#[derive(Debug, Error, Diagnostic)]
#[error("{inner}")]
#[allow(unused_assignments)]
pub struct SpannedLoadError {
    #[source_code]
    pub src: NamedSource<String>,
    pub inner: LoadError,
    #[label("here")]
    pub span: Option<SourceSpan>,
}

/// Load a bilayer from a JSON string.
pub fn load_str(json: &str) -> Result<Bilayer, LoadError> {
    let doc: BilayerDocument = serde_json::from_str(json)?;
    load_document(&doc)
}

/// Load a bilayer from any reader producing JSON.
pub fn load_reader<R: Read>(reader: R) -> Result<Bilayer, LoadError> {
    let doc: BilayerDocument = serde_json::from_reader(reader)?;
    load_document(&doc)
}

/// Load a bilayer JSON file from disk.
pub fn load_file(path: impl AsRef<Path>) -> Result<Bilayer, LoadError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = source.len(), "read bilayer file");
    load_str(&source)
}

/// Load a bilayer from JSON, with rich source-span diagnostics.
///
/// This wraps `load_str()` and attaches source spans for pretty error reporting via miette.
#[allow(clippy::result_large_err)]
pub fn load_with_source(source: &str, filename: &str) -> Result<Bilayer, SpannedLoadError> {
    load_str(source).map_err(|err| {
        let span = find_span_for_error(&err, source);
        SpannedLoadError {
            src: NamedSource::new(filename, source.to_string()),
            inner: err,
            span,
        }
    })
}

/// Build a graph from an already-deserialized document.
///
/// Nodes are numbered from 1 in document order. Output edges are the `Wa`
/// entries followed by the `Wn` entries.
pub fn load_document(doc: &BilayerDocument) -> Result<Bilayer, LoadError> {
    let mut bilayer = Bilayer::new();

    for (entry, state) in doc.qin.iter().enumerate() {
        check_name("Qin", entry, &state.variable)?;
        bilayer.add_state(state.variable.as_str());
    }
    for (entry, tangent) in doc.qout.iter().enumerate() {
        check_name("Qout", entry, &tangent.tanvar)?;
        bilayer.add_tangent(tangent.tanvar.as_str());
    }
    for (entry, flux) in doc.boxes.iter().enumerate() {
        check_name("Box", entry, &flux.parameter)?;
        bilayer.add_flux(flux.parameter.as_str());
    }

    for (entry, edge) in doc.win.iter().enumerate() {
        bilayer
            .add_input_edge(edge.arg, edge.call)
            .map_err(|reference| {
                let field = match reference.kind {
                    NodeKind::State => "arg",
                    _ => "call",
                };
                dangling("Win", entry, field, reference)
            })?;
    }
    for (entry, edge) in doc.wa.iter().enumerate() {
        bilayer
            .add_output_edge(edge.influx, edge.infusion, Polarity::Positive)
            .map_err(|reference| {
                let field = match reference.kind {
                    NodeKind::Flux => "influx",
                    _ => "infusion",
                };
                dangling("Wa", entry, field, reference)
            })?;
    }
    for (entry, edge) in doc.wn.iter().enumerate() {
        bilayer
            .add_output_edge(edge.efflux, edge.effusion, Polarity::Negative)
            .map_err(|reference| {
                let field = match reference.kind {
                    NodeKind::Flux => "efflux",
                    _ => "effusion",
                };
                dangling("Wn", entry, field, reference)
            })?;
    }

    warn_on_suspicious_structure(&bilayer);
    debug!(
        states = bilayer.states().len(),
        tangents = bilayer.tangents().len(),
        fluxes = bilayer.fluxes().len(),
        input_edges = bilayer.input_edges().len(),
        output_edges = bilayer.output_edges().len(),
        "loaded bilayer"
    );
    Ok(bilayer)
}

impl TryFrom<BilayerDocument> for Bilayer {
    type Error = LoadError;

    fn try_from(doc: BilayerDocument) -> Result<Self, LoadError> {
        load_document(&doc)
    }
}

fn dangling(
    collection: &'static str,
    entry: usize,
    field: &'static str,
    reference: DanglingReference,
) -> LoadError {
    LoadError::DanglingReference {
        collection,
        entry,
        field,
        reference,
    }
}
