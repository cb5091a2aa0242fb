//! Loader tests over on-disk bilayer documents.

use std::io::Write;
use std::path::PathBuf;

use bilayer_ir::bilayer::Polarity;
use bilayer_ir::loading::{load_file, load_reader, load_with_source, LoadError};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn sir_fixture_loads_with_expected_shape() {
    let b = load_file(fixture("sir.json")).expect("load sir.json");

    let states: Vec<_> = b.states().iter().map(|s| s.parameter.as_str()).collect();
    assert_eq!(states, vec!["S", "I", "R"]);
    let tangents: Vec<_> = b.tangents().iter().map(|t| t.parameter.as_str()).collect();
    assert_eq!(tangents, vec!["S'", "I'", "R'"]);
    assert_eq!(b.fluxes().len(), 2);
    assert_eq!(b.input_edges().len(), 3);

    // Wa entries first, then Wn, each in file order.
    let out: Vec<_> = b
        .output_edges()
        .iter()
        .map(|e| (e.src, e.tgt, e.polarity))
        .collect();
    assert_eq!(
        out,
        vec![
            (1, 2, Polarity::Positive),
            (2, 3, Polarity::Positive),
            (1, 1, Polarity::Negative),
            (2, 2, Polarity::Negative),
        ]
    );

    let vars = b.variables().expect("aligned layers");
    assert_eq!(vars[2].state.parameter, "R");
    assert_eq!(vars[2].tangent.parameter, "R'");
}

#[test]
fn dangling_flux_fixture_is_rejected() {
    let err = load_file(fixture("dangling_flux.json")).unwrap_err();
    match err {
        LoadError::DanglingReference {
            collection, field, ..
        } => {
            assert_eq!(collection, "Wn");
            assert_eq!(field, "efflux");
        }
        other => panic!("expected DanglingReference, got {other:?}"),
    }
}

#[test]
fn dangling_reference_diagnostic_labels_collection() {
    let source = std::fs::read_to_string(fixture("dangling_flux.json")).expect("read fixture");
    let err = load_with_source(&source, "dangling_flux.json").unwrap_err();
    let span = err.span.expect("span for dangling reference");
    assert_eq!(&source[span.offset()..span.offset() + span.len()], "\"Wn\"");
    assert!(err.to_string().contains("efflux"), "{err}");
}

#[test]
fn reader_and_file_loading_agree() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    let source = std::fs::read(fixture("sir.json")).expect("read fixture");
    file.write_all(&source).expect("write tempfile");

    let from_file = load_file(file.path()).expect("load file");
    let from_reader = load_reader(source.as_slice()).expect("load reader");
    assert_eq!(from_file, from_reader);
}
