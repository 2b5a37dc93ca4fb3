//! # System Interaction Layer
//!
//! The boundary between the compilation core and where template files live.
//!
//! ## Modules
//!
//! - **`storage`**: the `FileStorage` trait, a directory-backed implementation used by the
//!   CLI, and an in-memory one for embedding and tests.

pub mod storage;
