pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;

pub use crate::config::{ConfigError, HostOptions};
pub use crate::core::error::{CompileError, CompileResult};
pub use crate::core::host::CompilationHost;
