#![doc = include_str!("../README.md")]

//! SMT encoding and solver integration for bilayer models.
//!
//! This crate turns a bilayer graph into forward-Euler update equations over
//! real-sorted symbols, simplifies and prints them, and checks queries
//! against them through a pluggable solver interface.

pub mod backends;
pub mod encoder;
pub mod eval;
pub mod query;
pub mod simplify;
pub mod solver;
pub mod sorts;
pub mod terms;
