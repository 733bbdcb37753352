//! Port traits abstracting external collaborators away from the pipeline.

use addonpack_types::ToolkitVariant;
use camino::{Utf8Path, Utf8PathBuf};

pub use addonpack_vcs::VcsPort;

/// Opaque UI transform: designer sources in, compiled interface modules out.
pub trait UiCompiler {
    /// Compile every designer file in `source_dir` for `variant`, writing the
    /// results into `output_dir` (which exists). Returns the files written.
    fn compile(
        &self,
        source_dir: &Utf8Path,
        output_dir: &Utf8Path,
        variant: ToolkitVariant,
    ) -> anyhow::Result<Vec<Utf8PathBuf>>;
}
