//! Symbol naming for forward-Euler encodings.
//!
//! Every `(parameter, timepoint)` pair maps to the real-sorted constant
//! `<parameter>_<timepoint>`. Timepoints are rendered as decimal integers,
//! which never contain `_`, so the last `_` of a symbol always separates the
//! parameter from the timepoint.

use indexmap::IndexMap;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

use super::Timepoint;

pub fn timed_var(parameter: &str, t: Timepoint) -> String {
    format!("{parameter}_{t}")
}

/// Inverse of [`timed_var`].
pub fn split_timed_var(name: &str) -> Option<(&str, Timepoint)> {
    let (parameter, t) = name.rsplit_once('_')?;
    // `parse` accepts a leading '+', which timed_var never emits.
    if t.starts_with('+') {
        return None;
    }
    Some((parameter, t.parse().ok()?))
}

/// Symbols bound during one encoding session, in first-use order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: IndexMap<(String, Timepoint), String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The variable standing for `parameter` at timepoint `t`.
    pub fn symbol_for(&mut self, parameter: &str, t: Timepoint) -> SmtTerm {
        let key = (parameter.to_string(), t);
        let name = self
            .symbols
            .entry(key)
            .or_insert_with(|| timed_var(parameter, t));
        SmtTerm::var(name.clone())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn declarations(&self) -> Vec<(String, SmtSort)> {
        self.symbols
            .values()
            .map(|name| (name.clone(), SmtSort::Real))
            .collect()
    }
}
