//! Human-readable infix rendering of terms, e.g.
//! `S_1 == S_0 - inf_0*S_0*I_0 & I_1 == I_0 + inf_0*S_0*I_0`.
//!
//! Parentheses are emitted only where precedence or associativity demands
//! them. `+`, `-` and `*` associate to the left.

use crate::terms::SmtTerm;

const IMPLIES: u8 = 0;
const OR: u8 = 1;
const AND: u8 = 2;
const NOT: u8 = 3;
const CMP: u8 = 4;
const SUM: u8 = 5;
const PRODUCT: u8 = 6;
const NEG: u8 = 7;
const ATOM: u8 = 8;

pub fn to_infix(term: &SmtTerm) -> String {
    match term {
        SmtTerm::Var(name) => name.clone(),
        SmtTerm::IntLit(n) => n.to_string(),
        SmtTerm::RealLit(n) => format!("{n}.0"),
        SmtTerm::BoolLit(b) => b.to_string(),
        SmtTerm::Add(l, r) => binary(l, " + ", r, SUM, false),
        SmtTerm::Sub(l, r) => binary(l, " - ", r, SUM, true),
        SmtTerm::Mul(l, r) => binary(l, "*", r, PRODUCT, false),
        SmtTerm::Neg(inner) => format!("-{}", operand(inner, NEG, true)),
        SmtTerm::Eq(l, r) => binary(l, " == ", r, CMP, true),
        SmtTerm::Lt(l, r) => binary(l, " < ", r, CMP, true),
        SmtTerm::Le(l, r) => binary(l, " <= ", r, CMP, true),
        SmtTerm::Gt(l, r) => binary(l, " > ", r, CMP, true),
        SmtTerm::Ge(l, r) => binary(l, " >= ", r, CMP, true),
        SmtTerm::And(terms) => junction(terms, " & ", AND, "true"),
        SmtTerm::Or(terms) => junction(terms, " | ", OR, "false"),
        SmtTerm::Not(inner) => format!("!{}", operand(inner, NOT, false)),
        SmtTerm::Implies(l, r) => binary(l, " -> ", r, IMPLIES, true),
        SmtTerm::Ite(c, t, e) => format!("ite({}, {}, {})", to_infix(c), to_infix(t), to_infix(e)),
    }
}

fn precedence(term: &SmtTerm) -> u8 {
    match term {
        SmtTerm::RealLit(n) | SmtTerm::IntLit(n) if *n < 0 => NEG,
        SmtTerm::Var(_)
        | SmtTerm::IntLit(_)
        | SmtTerm::RealLit(_)
        | SmtTerm::BoolLit(_)
        | SmtTerm::Ite(..) => ATOM,
        SmtTerm::Neg(_) => NEG,
        SmtTerm::Mul(..) => PRODUCT,
        SmtTerm::Add(..) | SmtTerm::Sub(..) => SUM,
        SmtTerm::Eq(..) | SmtTerm::Lt(..) | SmtTerm::Le(..) | SmtTerm::Gt(..) | SmtTerm::Ge(..) => {
            CMP
        }
        SmtTerm::Not(_) => NOT,
        SmtTerm::And(terms) | SmtTerm::Or(terms) if terms.len() < 2 => match terms.first() {
            Some(only) => precedence(only),
            None => ATOM,
        },
        SmtTerm::And(_) => AND,
        SmtTerm::Or(_) => OR,
        SmtTerm::Implies(..) => IMPLIES,
    }
}

/// Render `term` as a child of an operator at `parent` precedence.
/// `strict` parenthesizes children that bind exactly as tightly, which is
/// needed on the right of non-associative operators.
fn operand(term: &SmtTerm, parent: u8, strict: bool) -> String {
    let own = precedence(term);
    if own < parent || (strict && own == parent) {
        format!("({})", to_infix(term))
    } else {
        to_infix(term)
    }
}

fn binary(lhs: &SmtTerm, op: &str, rhs: &SmtTerm, prec: u8, right_strict: bool) -> String {
    // Chained comparisons and implications read ambiguously without parens.
    let left_strict = prec == CMP || prec == IMPLIES;
    format!(
        "{}{op}{}",
        operand(lhs, prec, left_strict),
        operand(rhs, prec, right_strict)
    )
}

fn junction(terms: &[SmtTerm], op: &str, prec: u8, empty: &str) -> String {
    match terms {
        [] => empty.to_string(),
        [only] => to_infix(only),
        _ => terms
            .iter()
            .map(|t| operand(t, prec, false))
            .collect::<Vec<_>>()
            .join(op),
    }
}
