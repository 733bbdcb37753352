//! Embeddable build pipeline for addonpack.
//!
//! Clap-free and I/O-abstracted: version control and UI compilation sit
//! behind port traits so a host process or a test can drive the pipeline
//! without a `git` binary or a Qt toolchain.
//!
//! # Port traits
//!
//! - [`VcsPort`](ports::VcsPort): read-only history queries and tree export
//! - [`UiCompiler`](ports::UiCompiler): designer files in, interface modules out
//!
//! The [`adapters`] module provides the command-backed UI compiler; the
//! `git`-backed history lives in `addonpack-vcs`.
//!
//! # Entry points
//!
//! - [`TargetMatrix`](matrix::TargetMatrix) expands selectors into build units
//! - [`BuildPipeline`](pipeline::BuildPipeline) runs `create_dist`,
//!   `build_dist` and `package_dist` per unit
//! - [`clean`](clean::clean) removes build output

pub mod adapters;
pub mod clean;
pub mod error;
pub mod manifest;
pub mod matrix;
pub mod packager;
pub mod pipeline;
pub mod ports;
pub mod settings;
pub mod stager;
pub mod ui;

pub use error::{PipelineError, PipelineResult};
pub use pipeline::{BuildPipeline, RunReport, Stage, UnitOutcome};

// Re-export so embedders don't need addonpack-vcs directly.
pub use addonpack_vcs::{InMemoryHistory, ResolveError, ShellGit};
