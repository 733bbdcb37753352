//! Designer-file compilation into a module's `gui/forms` package.

use crate::error::{PipelineError, PipelineResult};
use crate::ports::UiCompiler;
use addonpack_types::ToolkitVariant;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::{debug, info};

/// Forms package, relative to the module directory.
pub const FORMS_DIR: &str = "gui/forms";

const SHIM_HEADER: &str = "# Generated by addonpack. Do not edit.\n";

/// Directory compiled forms for `variant` are written to.
pub fn forms_dir(module_dir: &Utf8Path, variant: ToolkitVariant) -> Utf8PathBuf {
    module_dir.join(FORMS_DIR).join(variant.as_str())
}

/// Compile every designer file in `designer_dir` for `variant`.
///
/// A missing designer directory is not an error; the add-on simply has no
/// forms and nothing is written.
pub fn compile_forms(
    compiler: &dyn UiCompiler,
    designer_dir: &Utf8Path,
    module_dir: &Utf8Path,
    variant: ToolkitVariant,
) -> PipelineResult<Vec<Utf8PathBuf>> {
    if !designer_dir.is_dir() {
        debug!(%designer_dir, "no designer directory; skipping UI compilation");
        return Ok(Vec::new());
    }

    let out = forms_dir(module_dir, variant);
    fs::create_dir_all(&out).with_context(|| format!("create {out}"))?;
    fs::write(out.join("__init__.py"), "").with_context(|| format!("write {out}/__init__.py"))?;

    let written = compiler
        .compile(designer_dir, &out, variant)
        .map_err(|source| PipelineError::TransformFailed { variant, source })?;
    info!(%variant, forms = written.len(), "compiled designer files");
    Ok(written)
}

/// Python source of the `gui/forms` package that re-exports the forms built for
/// the running toolkit.
pub fn shim_source(variants: &[ToolkitVariant]) -> String {
    let import = |v: ToolkitVariant| format!("from .{v} import *  # noqa: F401,F403\n");
    let qt5 = variants.contains(&ToolkitVariant::Qt5);
    let qt6 = variants.contains(&ToolkitVariant::Qt6);
    match (qt5, qt6) {
        (false, false) => SHIM_HEADER.to_string(),
        (true, false) => format!("{SHIM_HEADER}\n{}", import(ToolkitVariant::Qt5)),
        (false, true) => format!("{SHIM_HEADER}\n{}", import(ToolkitVariant::Qt6)),
        (true, true) => format!(
            "{SHIM_HEADER}\nfrom aqt.qt import qtmajor\n\nif qtmajor > 5:\n    {}else:\n    {}",
            import(ToolkitVariant::Qt6),
            import(ToolkitVariant::Qt5)
        ),
    }
}

/// Write the forms package shim for the compiled `variants`.
pub fn write_shim(module_dir: &Utf8Path, variants: &[ToolkitVariant]) -> PipelineResult<Utf8PathBuf> {
    let dir = module_dir.join(FORMS_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("create {dir}"))?;
    let path = dir.join("__init__.py");
    fs::write(&path, shim_source(variants)).with_context(|| format!("write {path}"))?;
    Ok(path)
}
