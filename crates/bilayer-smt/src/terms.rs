use indexmap::IndexSet;

/// Abstract SMT term representation, solver-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum SmtTerm {
    /// Variable reference by name.
    Var(String),
    /// Integer literal.
    IntLit(i64),
    /// Real literal with an integral value.
    RealLit(i64),
    /// Boolean literal.
    BoolLit(bool),

    // Arithmetic
    Add(Box<SmtTerm>, Box<SmtTerm>),
    Sub(Box<SmtTerm>, Box<SmtTerm>),
    Mul(Box<SmtTerm>, Box<SmtTerm>),
    Neg(Box<SmtTerm>),

    // Comparison
    Eq(Box<SmtTerm>, Box<SmtTerm>),
    Lt(Box<SmtTerm>, Box<SmtTerm>),
    Le(Box<SmtTerm>, Box<SmtTerm>),
    Gt(Box<SmtTerm>, Box<SmtTerm>),
    Ge(Box<SmtTerm>, Box<SmtTerm>),

    // Boolean logic
    And(Vec<SmtTerm>),
    Or(Vec<SmtTerm>),
    Not(Box<SmtTerm>),
    Implies(Box<SmtTerm>, Box<SmtTerm>),

    // If-then-else
    Ite(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),
}

#[allow(clippy::should_implement_trait)]
impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        SmtTerm::IntLit(n)
    }

    pub fn real(n: i64) -> Self {
        SmtTerm::RealLit(n)
    }

    pub fn bool(b: bool) -> Self {
        SmtTerm::BoolLit(b)
    }

    pub fn add(self, other: SmtTerm) -> Self {
        SmtTerm::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: SmtTerm) -> Self {
        SmtTerm::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: SmtTerm) -> Self {
        SmtTerm::Mul(Box::new(self), Box::new(other))
    }

    pub fn neg(self) -> Self {
        SmtTerm::Neg(Box::new(self))
    }

    pub fn eq(self, other: SmtTerm) -> Self {
        SmtTerm::Eq(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: SmtTerm) -> Self {
        SmtTerm::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: SmtTerm) -> Self {
        SmtTerm::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: SmtTerm) -> Self {
        SmtTerm::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: SmtTerm) -> Self {
        SmtTerm::Ge(Box::new(self), Box::new(other))
    }

    pub fn and(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::And(terms)
    }

    pub fn or(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Or(terms)
    }

    pub fn not(self) -> Self {
        SmtTerm::Not(Box::new(self))
    }

    pub fn implies(self, other: SmtTerm) -> Self {
        SmtTerm::Implies(Box::new(self), Box::new(other))
    }

    pub fn ite(cond: SmtTerm, then: SmtTerm, els: SmtTerm) -> Self {
        SmtTerm::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    /// Names of all variables in the term, in first-occurrence order.
    pub fn free_vars(&self) -> Vec<String> {
        let mut out = IndexSet::new();
        self.collect_vars(&mut out);
        out.into_iter().collect()
    }

    fn collect_vars(&self, out: &mut IndexSet<String>) {
        match self {
            SmtTerm::Var(name) => {
                if !out.contains(name) {
                    out.insert(name.clone());
                }
            }
            SmtTerm::IntLit(_) | SmtTerm::RealLit(_) | SmtTerm::BoolLit(_) => {}
            SmtTerm::Neg(inner) | SmtTerm::Not(inner) => inner.collect_vars(out),
            SmtTerm::Add(lhs, rhs)
            | SmtTerm::Sub(lhs, rhs)
            | SmtTerm::Mul(lhs, rhs)
            | SmtTerm::Eq(lhs, rhs)
            | SmtTerm::Lt(lhs, rhs)
            | SmtTerm::Le(lhs, rhs)
            | SmtTerm::Gt(lhs, rhs)
            | SmtTerm::Ge(lhs, rhs)
            | SmtTerm::Implies(lhs, rhs) => {
                lhs.collect_vars(out);
                rhs.collect_vars(out);
            }
            SmtTerm::And(terms) | SmtTerm::Or(terms) => {
                for t in terms {
                    t.collect_vars(out);
                }
            }
            SmtTerm::Ite(cond, then, els) => {
                cond.collect_vars(out);
                then.collect_vars(out);
                els.collect_vars(out);
            }
        }
    }

    /// Number of `Eq` nodes in the term.
    pub fn count_equalities(&self) -> usize {
        match self {
            SmtTerm::Var(_) | SmtTerm::IntLit(_) | SmtTerm::RealLit(_) | SmtTerm::BoolLit(_) => 0,
            SmtTerm::Eq(lhs, rhs) => 1 + lhs.count_equalities() + rhs.count_equalities(),
            SmtTerm::Neg(inner) | SmtTerm::Not(inner) => inner.count_equalities(),
            SmtTerm::Add(lhs, rhs)
            | SmtTerm::Sub(lhs, rhs)
            | SmtTerm::Mul(lhs, rhs)
            | SmtTerm::Lt(lhs, rhs)
            | SmtTerm::Le(lhs, rhs)
            | SmtTerm::Gt(lhs, rhs)
            | SmtTerm::Ge(lhs, rhs)
            | SmtTerm::Implies(lhs, rhs) => lhs.count_equalities() + rhs.count_equalities(),
            SmtTerm::And(terms) | SmtTerm::Or(terms) => {
                terms.iter().map(SmtTerm::count_equalities).sum()
            }
            SmtTerm::Ite(cond, then, els) => {
                cond.count_equalities() + then.count_equalities() + els.count_equalities()
            }
        }
    }
}
