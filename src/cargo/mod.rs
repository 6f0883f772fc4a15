//! Cargo package integration
//!
//! - **manifest**: Read and rewrite the package version (Cargo.toml, Cargo.lock) with toml_edit
//! - **package**: Locate the package via cargo_metadata and build its `.crate` artifact

pub mod manifest;
pub mod package;
