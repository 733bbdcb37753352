//! Project configuration for addonpack.
//!
//! Loads the add-on properties from `addon.json` and the optional tool
//! configuration from `addonpack.toml`, both at the project root. Settings
//! given on the command line take precedence over the config file.

use addonpack_core::adapters::CommandUiCompiler;
use addonpack_core::settings::PipelineSettings;
use addonpack_types::AddonProperties;
use anyhow::Context;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "addonpack.toml";

/// Declarative add-on properties.
pub const PROPERTIES_FILE_NAME: &str = "addon.json";

/// Top-level configuration from addonpack.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AddonpackConfig {
    pub build: BuildConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Build output directory, relative to the project root (default: `build`).
    pub dir: Option<Utf8PathBuf>,

    /// Paths inside a staged tree kept when it is staged again.
    pub preserve: Vec<Utf8PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UiConfig {
    /// Designer files, relative to the project root.
    pub designer_dir: Utf8PathBuf,

    /// Compiler program for Qt5 forms.
    pub qt5: String,

    /// Compiler program for Qt6 forms.
    pub qt6: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        let compiler = CommandUiCompiler::default();
        Self {
            designer_dir: Utf8PathBuf::from("designer"),
            qt5: compiler.qt5_program,
            qt6: compiler.qt6_program,
        }
    }
}

/// Discover the addonpack.toml config file.
///
/// Returns `None` if the project root has none.
pub fn discover_config(project_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = project_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

pub fn load_config(path: &Utf8Path) -> anyhow::Result<AddonpackConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<AddonpackConfig> {
    let config: AddonpackConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the project root, or return the default if not found.
pub fn load_or_default(project_root: &Utf8Path) -> anyhow::Result<AddonpackConfig> {
    match discover_config(project_root) {
        Some(path) => load_config(&path),
        None => Ok(AddonpackConfig::default()),
    }
}

/// Fail unless `project_root` looks like an add-on project.
pub fn validate_project_root(project_root: &Utf8Path) -> anyhow::Result<()> {
    for required in [
        project_root.join("src"),
        project_root.join(PROPERTIES_FILE_NAME),
    ] {
        if !required.exists() {
            anyhow::bail!(
                "{} not found; run addonpack from the add-on project root or pass --project-root",
                required
            );
        }
    }
    Ok(())
}

/// Read `addon.json` from the project root.
pub fn load_properties(project_root: &Utf8Path) -> anyhow::Result<AddonProperties> {
    let path = project_root.join(PROPERTIES_FILE_NAME);
    let contents = fs::read_to_string(&path).with_context(|| format!("read {}", path))?;
    let props = AddonProperties::from_json(&contents).with_context(|| format!("parse {}", path))?;
    if props.module_name.trim().is_empty() {
        anyhow::bail!("{}: module_name must not be empty", path);
    }
    Ok(props)
}

/// Settings after merging the config file with CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub settings: PipelineSettings,
    pub compiler: CommandUiCompiler,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: AddonpackConfig,
}

impl ConfigMerger {
    pub fn new(config: AddonpackConfig) -> Self {
        Self { config }
    }

    /// Merge with the global CLI arguments.
    ///
    /// A CLI `--build-dir` replaces the configured one and is taken as given;
    /// the configured one is relative to the project root.
    pub fn merge(
        self,
        project_root: &Utf8Path,
        cli_build_dir: Option<Utf8PathBuf>,
    ) -> anyhow::Result<MergedConfig> {
        for keep in &self.config.build.preserve {
            if !is_contained_relative(keep) {
                anyhow::bail!(
                    "preserve path '{}' must be relative and stay inside the staged tree",
                    keep
                );
            }
        }

        let mut settings = PipelineSettings::new(project_root.to_path_buf());
        if let Some(dir) = cli_build_dir {
            settings.build_dir = dir;
        } else if let Some(dir) = self.config.build.dir {
            settings.build_dir = project_root.join(dir);
        }
        settings.preserve = self.config.build.preserve;
        settings.designer_dir = self.config.ui.designer_dir;

        Ok(MergedConfig {
            settings,
            compiler: CommandUiCompiler {
                qt5_program: self.config.ui.qt5,
                qt6_program: self.config.ui.qt6,
            },
        })
    }
}

fn is_contained_relative(path: &Utf8Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|c| matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir))
}
