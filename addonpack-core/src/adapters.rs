//! Default port implementations.

use crate::ports::UiCompiler;
use addonpack_types::ToolkitVariant;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use glob::glob;
use std::process::Command;
use tracing::debug;

/// Runs a `pyuic`-style program once per designer file:
/// `<program> <input.ui> -o <output.py>`.
#[derive(Debug, Clone)]
pub struct CommandUiCompiler {
    pub qt5_program: String,
    pub qt6_program: String,
}

impl Default for CommandUiCompiler {
    fn default() -> Self {
        Self {
            qt5_program: "pyuic5".to_string(),
            qt6_program: "pyuic6".to_string(),
        }
    }
}

impl CommandUiCompiler {
    pub fn program(&self, variant: ToolkitVariant) -> &str {
        match variant {
            ToolkitVariant::Qt5 => &self.qt5_program,
            ToolkitVariant::Qt6 => &self.qt6_program,
        }
    }
}

/// Designer files directly inside `dir`, sorted.
pub fn designer_files(dir: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let pattern = dir.join("*.ui");
    let mut out = Vec::new();
    for entry in glob(pattern.as_str()).with_context(|| format!("glob {pattern}"))? {
        let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
        let path = Utf8PathBuf::from_path_buf(path)
            .map_err(|p| anyhow::anyhow!("non utf-8 path {}", p.display()))?;
        out.push(path);
    }
    out.sort();
    Ok(out)
}

impl UiCompiler for CommandUiCompiler {
    fn compile(
        &self,
        source_dir: &Utf8Path,
        output_dir: &Utf8Path,
        variant: ToolkitVariant,
    ) -> anyhow::Result<Vec<Utf8PathBuf>> {
        let program = self.program(variant);
        let mut written = Vec::new();
        for input in designer_files(source_dir)? {
            let stem = input
                .file_stem()
                .with_context(|| format!("designer file without a name: {input}"))?;
            let output = output_dir.join(format!("{stem}.py"));
            debug!(%input, %output, program, "compiling designer file");

            let out = Command::new(program)
                .arg(input.as_str())
                .arg("-o")
                .arg(output.as_str())
                .output()
                .with_context(|| format!("run {program}"))?;
            if !out.status.success() {
                anyhow::bail!(
                    "{program} failed on {input}: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                );
            }
            written.push(output);
        }
        Ok(written)
    }
}
