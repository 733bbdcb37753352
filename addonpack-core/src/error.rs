//! Error types for the addonpack pipeline.
//!
//! Errors fall into two groups:
//! - Input errors (exit code 2): bad references, selectors, properties or stage order.
//! - Runtime errors (exit code 1): I/O, version control and compiler failures.
//!
//! None of them is retried; each is terminal for the build unit it occurred in.

use addonpack_types::{StageState, ToolkitVariant};
use addonpack_vcs::ResolveError;
use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Version resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The destination holds data this stager did not produce.
    #[error("refusing to stage into {dir}: directory is not empty and was not staged by addonpack")]
    StageConflict { dir: Utf8PathBuf },

    /// A stage ran before the stage it depends on.
    #[error("{dir} is not ready: {required} stage required ({reason})")]
    NotStaged {
        dir: Utf8PathBuf,
        required: StageState,
        reason: String,
    },

    /// `all` channels where exactly one is needed.
    #[error("'all' is not a valid channel when generating a manifest; pick a single channel")]
    AmbiguousChannel,

    /// Hosted packages need the hosted id.
    #[error("add-on '{module}' has no ankiweb_id; it is required for the hosted channel")]
    MissingHostedId { module: String },

    #[error("ankiweb_id '{value}' is not numeric")]
    InvalidHostedId { value: String },

    /// A target or channel selector outside the accepted set.
    #[error("unknown {kind} '{value}'")]
    InvalidSelector { kind: &'static str, value: String },

    /// The external UI compiler failed.
    #[error("UI compilation for {variant} failed: {source:#}")]
    TransformFailed {
        variant: ToolkitVariant,
        #[source]
        source: anyhow::Error,
    },

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    /// Returns true for errors caused by caller input rather than the environment.
    pub fn is_input_error(&self) -> bool {
        match self {
            PipelineError::Resolve(ResolveError::Vcs(_)) => false,
            PipelineError::Resolve(_) => true,
            PipelineError::StageConflict { .. }
            | PipelineError::NotStaged { .. }
            | PipelineError::AmbiguousChannel
            | PipelineError::MissingHostedId { .. }
            | PipelineError::InvalidHostedId { .. }
            | PipelineError::InvalidSelector { .. } => true,
            PipelineError::TransformFailed { .. } | PipelineError::Internal(_) => false,
        }
    }

    /// Returns the recommended exit code for this error.
    pub fn exit_code(&self) -> u8 {
        if self.is_input_error() { 2 } else { 1 }
    }
}

/// Result type alias using PipelineError.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_report_exit_code_2() {
        let err = PipelineError::MissingHostedId {
            module: "demo".to_string(),
        };
        assert!(err.is_input_error());
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("ankiweb_id"));

        let err = PipelineError::from(ResolveError::NoReleaseFound);
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "no release tag is reachable from HEAD");
    }

    #[test]
    fn runtime_errors_report_exit_code_1() {
        let err = PipelineError::from(anyhow::anyhow!("boom"));
        assert!(!err.is_input_error());
        assert_eq!(err.exit_code(), 1);

        let err = PipelineError::from(ResolveError::Vcs(anyhow::anyhow!("git missing")));
        assert_eq!(err.exit_code(), 1);

        let err = PipelineError::TransformFailed {
            variant: ToolkitVariant::Qt6,
            source: anyhow::anyhow!("pyuic6 not found"),
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("qt6"));
        assert!(err.to_string().contains("pyuic6 not found"));
    }

    #[test]
    fn not_staged_names_directory_and_stage() {
        let err = PipelineError::NotStaged {
            dir: Utf8PathBuf::from("build/dist/qt5-local"),
            required: StageState::Built,
            reason: "no stage marker".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("build/dist/qt5-local"));
        assert!(msg.contains("built stage required"));
    }
}
