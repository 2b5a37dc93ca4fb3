// src/cli/handlers/mod.rs

pub mod chain;
pub mod commons;
pub mod compile;
pub mod resolve;
