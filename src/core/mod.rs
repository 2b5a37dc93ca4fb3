// src/core/mod.rs

//! # Compilation Core
//!
//! Everything between a template on storage and its generated code.
//!
//! - **`chunk_cache`**: parsed directive files, validated against file stamps and content hashes.
//! - **`inheritance`**: finds the directive files that apply to a template.
//! - **`merge`**: folds defaults, ancestors and a template's own directives.
//! - **`host`**: the entry point that ties parsing, inheritance and generation together.

pub mod chunk_cache;
pub mod directive_parser;
pub mod engine;
pub mod error;
pub mod generator;
pub mod host;
pub mod inheritance;
pub mod merge;
pub mod paths;
