//! Solver round trips. These need solver binaries on `PATH` and are ignored
//! by default; run with `cargo test -- --ignored`.

use bilayer_ir::loading::load_str;
use bilayer_smt::backends::process_backend::SmtLibProcess;
use bilayer_smt::encoder::{encode, BilayerEncoding, EncoderOptions};
use bilayer_smt::eval::eval_bool;
use bilayer_smt::query::{check_consistency, check_entailment, QueryVerdict};
use bilayer_smt::solver::SmtSolver;
use bilayer_smt::terms::SmtTerm;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const DECAY: &str = r#"{
    "Qin": [{"variable": "x"}],
    "Qout": [{"tanvar": "dx"}],
    "Box": [{"parameter": "k"}],
    "Win": [{"arg": 1, "call": 1}],
    "Wa": [],
    "Wn": [{"efflux": 1, "effusion": 1}]
}"#;

fn decay_encoding() -> Result<BilayerEncoding, Box<dyn std::error::Error>> {
    let bilayer = load_str(DECAY)?;
    Ok(encode(&bilayer, &[0, 1], &EncoderOptions::default())?)
}

/// x_0 = 1, k_0 = k_1 = 1/2, so x_2 = 1/4.
fn pinned_start() -> SmtTerm {
    SmtTerm::and(vec![
        SmtTerm::var("x_0").eq(SmtTerm::real(1)),
        SmtTerm::real(2).mul(SmtTerm::var("k_0")).eq(SmtTerm::real(1)),
        SmtTerm::var("k_1").eq(SmtTerm::var("k_0")),
    ])
}

fn exercise<S: SmtSolver>(solver: &mut S) -> TestResult
where
    S::Error: 'static,
{
    let enc = decay_encoding()?;

    let verdict = check_consistency(solver, &enc, &pinned_start())?;
    let witness = verdict
        .witness()
        .ok_or_else(|| std::io::Error::other("expected a witness"))?;
    assert_eq!(witness.get_real("x_2"), Some(0.25));
    assert_eq!(eval_bool(&enc.formula(), &witness.real_assignment()), Ok(true));

    let never_below_quarter = pinned_start().implies(SmtTerm::real(4).mul(SmtTerm::var("x_2")).ge(SmtTerm::real(1)));
    assert!(check_entailment(solver, &enc, &never_below_quarter)?.holds());

    let strictly_above = pinned_start().implies(SmtTerm::real(4).mul(SmtTerm::var("x_2")).gt(SmtTerm::real(1)));
    assert!(matches!(
        check_entailment(solver, &enc, &strictly_above)?,
        QueryVerdict::Refuted { witness: Some(_) }
    ));
    Ok(())
}

#[test]
#[ignore = "needs z3 on PATH"]
fn z3_process_answers_decay_queries() -> TestResult {
    exercise(&mut SmtLibProcess::z3()?)
}

#[test]
#[ignore = "needs cvc5 on PATH"]
fn cvc5_process_answers_decay_queries() -> TestResult {
    exercise(&mut SmtLibProcess::cvc5()?)
}

#[cfg(feature = "z3")]
#[test]
fn native_z3_answers_decay_queries() -> TestResult {
    exercise(&mut bilayer_smt::backends::z3_backend::Z3Solver::new())
}
