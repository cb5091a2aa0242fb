#![doc = include_str!("../README.md")]

//! Bilayer intermediate representation and loading.
//!
//! This crate defines the bilayer graph model (state, tangent and flux
//! nodes with signed edges between them), the raw JSON document shapes, and
//! the loader that turns a document into an index-checked graph.

pub mod bilayer;
pub mod document;
pub mod loading;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
