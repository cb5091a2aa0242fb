//! Drive any SMT-LIB2 solver binary over stdin/stdout.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::backends::smtlib_printer::{quote_symbol, sort_to_smtlib, to_smtlib};
use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Nonlinear real arithmetic: flux terms multiply rates by states.
pub const DEFAULT_LOGIC: &str = "QF_NRA";

#[derive(Debug, Error)]
pub enum ProcessSolverError {
    #[error("solver I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("solver not found: {0}")]
    NotFound(String),
    #[error("solver error: {0}")]
    SolverError(String),
    #[error("Failed to parse solver output: {0}")]
    ParseError(String),
}

pub struct SmtLibProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
    program: String,
    logic: String,
}

impl SmtLibProcess {
    /// `z3 -in -smt2`, found on `PATH`.
    pub fn z3() -> Result<Self, ProcessSolverError> {
        Self::z3_with_timeout_ms(None)
    }

    pub fn z3_with_timeout_ms(timeout_ms: Option<u64>) -> Result<Self, ProcessSolverError> {
        let mut args = vec!["-in".to_string(), "-smt2".to_string()];
        if let Some(ms) = timeout_ms {
            args.push(format!("-t:{ms}"));
        }
        Self::spawn("z3", &args, DEFAULT_LOGIC)
    }

    /// `cvc5 --incremental`, found on `PATH`.
    pub fn cvc5() -> Result<Self, ProcessSolverError> {
        Self::cvc5_with_timeout_ms(None)
    }

    pub fn cvc5_with_timeout_ms(timeout_ms: Option<u64>) -> Result<Self, ProcessSolverError> {
        let mut args = vec![
            "--lang".to_string(),
            "smt2".to_string(),
            "--incremental".to_string(),
            "--produce-models".to_string(),
        ];
        if let Some(ms) = timeout_ms {
            args.push(format!("--tlimit-per={ms}"));
        }
        Self::spawn("cvc5", &args, DEFAULT_LOGIC)
    }

    /// Start `program` with `args` and set `logic`. The process must read
    /// SMT-LIB2 from stdin and must not print `success` acknowledgements.
    pub fn spawn(program: &str, args: &[String], logic: &str) -> Result<Self, ProcessSolverError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProcessSolverError::NotFound(format!("{program}: {e}")))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            ProcessSolverError::SolverError(format!("failed to capture {program} stdin"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ProcessSolverError::SolverError(format!("failed to capture {program} stdout"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            ProcessSolverError::SolverError(format!("failed to capture {program} stderr"))
        })?;

        let mut solver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: BufReader::new(stderr),
            program: program.to_string(),
            logic: logic.to_string(),
        };
        solver.start_session()?;
        debug!(program, logic, "started SMT-LIB solver process");
        Ok(solver)
    }

    fn start_session(&mut self) -> Result<(), ProcessSolverError> {
        self.send_command_no_response("(set-option :produce-models true)")?;
        let logic = format!("(set-logic {})", self.logic);
        self.send_command_no_response(&logic)
    }

    /// Send `cmd` and read one complete response, which may span several
    /// lines when it is a parenthesized expression.
    fn send_command(&mut self, cmd: &str) -> Result<String, ProcessSolverError> {
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;

        let mut response = String::new();
        let mut depth: i64 = 0;
        loop {
            let mut line = String::new();
            if self.stdout.read_line(&mut line)? == 0 {
                let mut stderr = String::new();
                let _ = self.stderr.read_line(&mut stderr);
                return Err(ProcessSolverError::SolverError(format!(
                    "No response from {} for command `{cmd}`. stderr: {}",
                    self.program,
                    stderr.trim()
                )));
            }
            depth += paren_balance(&line);
            response.push_str(&line);
            if depth <= 0 && !response.trim().is_empty() {
                break;
            }
        }
        let response = response.trim().to_string();
        if response.starts_with("(error") {
            return Err(ProcessSolverError::SolverError(response));
        }
        Ok(response)
    }

    fn send_command_no_response(&mut self, cmd: &str) -> Result<(), ProcessSolverError> {
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for SmtLibProcess {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl SmtSolver for SmtLibProcess {
    type Error = ProcessSolverError;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), ProcessSolverError> {
        let sort_str = sort_to_smtlib(sort);
        let symbol = quote_symbol(name);
        self.send_command_no_response(&format!("(declare-const {symbol} {sort_str})"))
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), ProcessSolverError> {
        let smt_str = to_smtlib(term);
        self.send_command_no_response(&format!("(assert {smt_str})"))?;
        Ok(())
    }

    fn push(&mut self) -> Result<(), ProcessSolverError> {
        self.send_command_no_response("(push 1)")
    }

    fn pop(&mut self) -> Result<(), ProcessSolverError> {
        self.send_command_no_response("(pop 1)")
    }

    fn check_sat(&mut self) -> Result<SatResult, ProcessSolverError> {
        let response = self.send_command("(check-sat)")?;
        match response.as_str() {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" => Ok(SatResult::Unknown(format!("{} returned unknown", self.program))),
            other => Err(ProcessSolverError::SolverError(other.to_string())),
        }
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), ProcessSolverError> {
        let result = self.check_sat()?;
        if result != SatResult::Sat {
            return Ok((result, None));
        }

        let mut values = HashMap::new();
        for &(name, sort) in var_names {
            let response = self.send_command(&format!("(get-value ({}))", quote_symbol(name)))?;
            // Response format: ((name value))
            match parse_value_response(&response, sort)? {
                Some(val) => {
                    values.insert(name.to_string(), val);
                }
                None => debug!(name, %response, "model value not representable; skipped"),
            }
        }

        Ok((SatResult::Sat, Some(Model { values })))
    }

    fn reset(&mut self) -> Result<(), ProcessSolverError> {
        self.send_command_no_response("(reset)")?;
        self.start_session()
    }
}

/// Net change in parenthesis depth over `line`, ignoring `|...|` symbols and
/// string literals.
fn paren_balance(line: &str) -> i64 {
    let mut depth = 0;
    let mut in_symbol = false;
    let mut in_string = false;
    for ch in line.chars() {
        match ch {
            '|' if !in_string => in_symbol = !in_symbol,
            '"' if !in_symbol => in_string = !in_string,
            '(' if !in_symbol && !in_string => depth += 1,
            ')' if !in_symbol && !in_string => depth -= 1,
            _ => {}
        }
    }
    depth
}

#[derive(Debug, Clone, PartialEq)]
enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

fn parse_sexpr(input: &str) -> Result<SExpr, ProcessSolverError> {
    let tokens = tokenize(input);
    let mut pos = 0;
    let expr = parse_tokens(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(ProcessSolverError::ParseError(format!(
            "trailing input in `{input}`"
        )));
    }
    Ok(expr)
}

fn tokenize(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut in_quoted_symbol = false;
    for ch in input.chars() {
        match ch {
            '|' => {
                buf.push(ch);
                in_quoted_symbol = !in_quoted_symbol;
            }
            _ if in_quoted_symbol => buf.push(ch),
            '(' | ')' => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
                out.push(ch.to_string());
            }
            c if c.is_whitespace() => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
            }
            other => buf.push(other),
        }
    }
    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

fn parse_tokens(tokens: &[String], pos: &mut usize) -> Result<SExpr, ProcessSolverError> {
    let token = tokens
        .get(*pos)
        .ok_or_else(|| ProcessSolverError::ParseError("unexpected end of input".into()))?;
    *pos += 1;
    match token.as_str() {
        "(" => {
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos).map(String::as_str) {
                    Some(")") => {
                        *pos += 1;
                        return Ok(SExpr::List(items));
                    }
                    Some(_) => items.push(parse_tokens(tokens, pos)?),
                    None => {
                        return Err(ProcessSolverError::ParseError("unbalanced '('".into()));
                    }
                }
            }
        }
        ")" => Err(ProcessSolverError::ParseError("unexpected ')'".into())),
        atom => Ok(SExpr::Atom(atom.to_string())),
    }
}

/// Extract the value from a `((name value))` response.
///
/// Returns `Ok(None)` when the value has no finite decimal representation
/// that this crate understands, such as `root-obj` algebraic numbers.
fn parse_value_response(
    response: &str,
    sort: &SmtSort,
) -> Result<Option<ModelValue>, ProcessSolverError> {
    let value = match parse_sexpr(response)? {
        SExpr::List(pairs) => match pairs.as_slice() {
            [SExpr::List(pair)] if pair.len() == 2 => pair[1].clone(),
            _ => {
                return Err(ProcessSolverError::ParseError(format!(
                    "expected ((name value)), got `{response}`"
                )))
            }
        },
        SExpr::Atom(_) => {
            return Err(ProcessSolverError::ParseError(format!(
                "expected ((name value)), got `{response}`"
            )))
        }
    };

    Ok(match sort {
        SmtSort::Bool => match &value {
            SExpr::Atom(a) if a == "true" => Some(ModelValue::Bool(true)),
            SExpr::Atom(a) if a == "false" => Some(ModelValue::Bool(false)),
            _ => None,
        },
        SmtSort::Int => int_value(&value).map(ModelValue::Int),
        SmtSort::Real => real_value(&value).map(ModelValue::Real),
    })
}

fn int_value(expr: &SExpr) -> Option<i64> {
    match expr {
        SExpr::Atom(a) => a.parse().ok(),
        SExpr::List(items) => match items.as_slice() {
            [SExpr::Atom(op), inner] if op == "-" => int_value(inner)?.checked_neg(),
            _ => None,
        },
    }
}

/// Real values: decimals, integers, `(- v)` and `(/ p q)`.
fn real_value(expr: &SExpr) -> Option<f64> {
    match expr {
        SExpr::Atom(a) => a.parse::<f64>().ok().filter(|v| v.is_finite()),
        SExpr::List(items) => match items.as_slice() {
            [SExpr::Atom(op), inner] if op == "-" => real_value(inner).map(|v| -v),
            [SExpr::Atom(op), num, den] if op == "/" => {
                let den = real_value(den)?;
                if den == 0.0 {
                    return None;
                }
                Some(real_value(num)? / den)
            }
            _ => None,
        },
    }
}
