//! Algebraic simplification of SMT terms.
//!
//! Rewriting is bottom-up and sound over real arithmetic. Literal folding
//! uses checked arithmetic and leaves the term alone on overflow. Equalities
//! themselves are never rewritten, so the update equations of an encoding
//! survive simplification one-for-one.
//!
//! Arithmetic is assumed to be real-sorted: cancelling `x - x` produces a
//! real zero.

use crate::terms::SmtTerm;

/// Simplify a term to a fixpoint of the rewrite rules.
pub fn simplify(term: &SmtTerm) -> SmtTerm {
    let node = match term {
        SmtTerm::Var(_) | SmtTerm::IntLit(_) | SmtTerm::RealLit(_) | SmtTerm::BoolLit(_) => {
            return term.clone();
        }
        SmtTerm::Add(lhs, rhs) => simplify(lhs).add(simplify(rhs)),
        SmtTerm::Sub(lhs, rhs) => simplify(lhs).sub(simplify(rhs)),
        SmtTerm::Mul(lhs, rhs) => simplify(lhs).mul(simplify(rhs)),
        SmtTerm::Neg(inner) => simplify(inner).neg(),
        SmtTerm::Eq(lhs, rhs) => simplify(lhs).eq(simplify(rhs)),
        SmtTerm::Lt(lhs, rhs) => simplify(lhs).lt(simplify(rhs)),
        SmtTerm::Le(lhs, rhs) => simplify(lhs).le(simplify(rhs)),
        SmtTerm::Gt(lhs, rhs) => simplify(lhs).gt(simplify(rhs)),
        SmtTerm::Ge(lhs, rhs) => simplify(lhs).ge(simplify(rhs)),
        SmtTerm::And(terms) => SmtTerm::And(terms.iter().map(simplify).collect()),
        SmtTerm::Or(terms) => SmtTerm::Or(terms.iter().map(simplify).collect()),
        SmtTerm::Not(inner) => simplify(inner).not(),
        SmtTerm::Implies(lhs, rhs) => simplify(lhs).implies(simplify(rhs)),
        SmtTerm::Ite(cond, then, els) => SmtTerm::ite(simplify(cond), simplify(then), simplify(els)),
    };
    rewrite(node)
}

/// Apply the rules at the root of a term whose children are already simplified.
fn rewrite(term: SmtTerm) -> SmtTerm {
    match term {
        SmtTerm::Add(lhs, rhs) => rewrite_add(*lhs, *rhs),
        SmtTerm::Sub(lhs, rhs) => rewrite_sub(*lhs, *rhs),
        SmtTerm::Mul(lhs, rhs) => rewrite_mul(*lhs, *rhs),
        SmtTerm::Neg(inner) => rewrite_neg(*inner),
        SmtTerm::Not(inner) => match *inner {
            SmtTerm::BoolLit(b) => SmtTerm::BoolLit(!b),
            SmtTerm::Not(x) => *x,
            other => other.not(),
        },
        SmtTerm::And(terms) => rewrite_junction(terms, true),
        SmtTerm::Or(terms) => rewrite_junction(terms, false),
        SmtTerm::Implies(lhs, rhs) => match (*lhs, *rhs) {
            (SmtTerm::BoolLit(true), x) => x,
            (SmtTerm::BoolLit(false), _) | (_, SmtTerm::BoolLit(true)) => SmtTerm::BoolLit(true),
            (l, r) => l.implies(r),
        },
        SmtTerm::Ite(cond, then, els) => match *cond {
            SmtTerm::BoolLit(true) => *then,
            SmtTerm::BoolLit(false) => *els,
            _ if then == els => *then,
            c => SmtTerm::Ite(Box::new(c), then, els),
        },
        other => other,
    }
}

fn rewrite_add(lhs: SmtTerm, rhs: SmtTerm) -> SmtTerm {
    match (lhs, rhs) {
        (SmtTerm::RealLit(0), x) | (x, SmtTerm::RealLit(0)) => x,
        (SmtTerm::IntLit(0), x) | (x, SmtTerm::IntLit(0)) => x,
        (SmtTerm::RealLit(a), SmtTerm::RealLit(b)) if a.checked_add(b).is_some() => {
            SmtTerm::RealLit(a + b)
        }
        (SmtTerm::IntLit(a), SmtTerm::IntLit(b)) if a.checked_add(b).is_some() => {
            SmtTerm::IntLit(a + b)
        }
        (a, SmtTerm::Neg(b)) => rewrite_sub(a, *b),
        (SmtTerm::Neg(a), b) => rewrite_sub(b, *a),
        (a, SmtTerm::Add(b, c)) => rewrite_add(rewrite_add(a, *b), *c),
        (a, SmtTerm::Sub(b, c)) => rewrite_sub(rewrite_add(a, *b), *c),
        (a, b) => a.add(b),
    }
}

fn rewrite_sub(lhs: SmtTerm, rhs: SmtTerm) -> SmtTerm {
    match (lhs, rhs) {
        (x, SmtTerm::RealLit(0)) | (x, SmtTerm::IntLit(0)) => x,
        (SmtTerm::RealLit(0), x) | (SmtTerm::IntLit(0), x) => rewrite_neg(x),
        (SmtTerm::RealLit(a), SmtTerm::RealLit(b)) if a.checked_sub(b).is_some() => {
            SmtTerm::RealLit(a - b)
        }
        (SmtTerm::IntLit(a), SmtTerm::IntLit(b)) if a.checked_sub(b).is_some() => {
            SmtTerm::IntLit(a - b)
        }
        (a, b) if a == b => SmtTerm::RealLit(0),
        (a, SmtTerm::Neg(b)) => rewrite_add(a, *b),
        (a, SmtTerm::Add(b, c)) => rewrite_sub(rewrite_sub(a, *b), *c),
        (a, SmtTerm::Sub(b, c)) => rewrite_add(rewrite_sub(a, *b), *c),
        (a, b) => a.sub(b),
    }
}

fn rewrite_mul(lhs: SmtTerm, rhs: SmtTerm) -> SmtTerm {
    match (lhs, rhs) {
        (SmtTerm::RealLit(1), x) | (x, SmtTerm::RealLit(1)) => x,
        (SmtTerm::IntLit(1), x) | (x, SmtTerm::IntLit(1)) => x,
        (SmtTerm::RealLit(0), _) | (_, SmtTerm::RealLit(0)) => SmtTerm::RealLit(0),
        (SmtTerm::IntLit(0), _) | (_, SmtTerm::IntLit(0)) => SmtTerm::IntLit(0),
        (SmtTerm::RealLit(a), SmtTerm::RealLit(b)) if a.checked_mul(b).is_some() => {
            SmtTerm::RealLit(a * b)
        }
        (SmtTerm::IntLit(a), SmtTerm::IntLit(b)) if a.checked_mul(b).is_some() => {
            SmtTerm::IntLit(a * b)
        }
        (SmtTerm::Neg(a), SmtTerm::Neg(b)) => rewrite_mul(*a, *b),
        (a, b) => a.mul(b),
    }
}

fn rewrite_neg(inner: SmtTerm) -> SmtTerm {
    match inner {
        SmtTerm::Neg(x) => *x,
        SmtTerm::RealLit(n) if n.checked_neg().is_some() => SmtTerm::RealLit(-n),
        SmtTerm::IntLit(n) if n.checked_neg().is_some() => SmtTerm::IntLit(-n),
        other => other.neg(),
    }
}

/// Flatten nested conjunctions (`is_and`) or disjunctions and absorb literals.
fn rewrite_junction(terms: Vec<SmtTerm>, is_and: bool) -> SmtTerm {
    let mut flat = Vec::with_capacity(terms.len());
    for term in terms {
        match term {
            SmtTerm::And(inner) if is_and => flat.extend(inner),
            SmtTerm::Or(inner) if !is_and => flat.extend(inner),
            SmtTerm::BoolLit(b) if b == is_and => {}
            SmtTerm::BoolLit(_) => return SmtTerm::BoolLit(!is_and),
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => SmtTerm::BoolLit(is_and),
        1 => flat.pop().unwrap_or(SmtTerm::BoolLit(is_and)),
        _ if is_and => SmtTerm::And(flat),
        _ => SmtTerm::Or(flat),
    }
}
