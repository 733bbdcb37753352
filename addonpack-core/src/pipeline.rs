//! Stage, transform and package build units.
//!
//! The three stages communicate only through the staged directory and its
//! marker, so each may run in a separate process.

use crate::error::{PipelineError, PipelineResult};
use crate::manifest::{ManifestSynthesizer, write_to_dir};
use crate::packager::{PackageOutcome, Packager};
use crate::ports::{UiCompiler, VcsPort};
use crate::settings::PipelineSettings;
use crate::stager::{StagedTree, WorkTreeStager};
use crate::ui;
use addonpack_types::{
    AddonProperties, BuildUnit, Channel, ResolvedVersion, StageState, ToolkitVariant, VersionRef,
};
use addonpack_vcs::VersionResolver;
use anyhow::Context;
use camino::Utf8PathBuf;
use fs_err as fs;
use tracing::{debug, info, warn};

const LICENSE_FILE: &str = "LICENSE";
const BUNDLED_LICENSE_FILE: &str = "LICENSE.txt";

/// Which part of the pipeline a run drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// `create_dist` only.
    Create,
    /// `build_dist` only.
    Build,
    /// `package_dist` only.
    Package,
    /// All three, in order.
    All,
}

/// Result of one unit within a [`RunReport`].
#[derive(Debug)]
pub struct UnitOutcome {
    pub unit: BuildUnit,
    /// The archive, for stages that package.
    pub result: PipelineResult<Option<PackageOutcome>>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<UnitOutcome>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = (&BuildUnit, &PipelineError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.unit, e)))
    }

    pub fn archives(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().and_then(Option::as_ref))
    }

    /// Highest exit code among failed units; 0 when every unit succeeded.
    pub fn exit_code(&self) -> u8 {
        self.failures()
            .map(|(_, e)| e.exit_code())
            .max()
            .unwrap_or(0)
    }
}

pub struct BuildPipeline<'a> {
    settings: &'a PipelineSettings,
    props: &'a AddonProperties,
    vcs: &'a dyn VcsPort,
    ui: &'a dyn UiCompiler,
}

impl<'a> BuildPipeline<'a> {
    pub fn new(
        settings: &'a PipelineSettings,
        props: &'a AddonProperties,
        vcs: &'a dyn VcsPort,
        ui: &'a dyn UiCompiler,
    ) -> Self {
        Self {
            settings,
            props,
            vcs,
            ui,
        }
    }

    pub fn resolve(&self, reference: &VersionRef) -> PipelineResult<ResolvedVersion> {
        let resolved = VersionResolver::new(self.vcs).resolve(reference)?;
        info!(%reference, version = %resolved, "resolved version");
        Ok(resolved)
    }

    /// Stage `unit.version` into the unit's own directory.
    pub fn create_dist(&self, unit: &BuildUnit) -> PipelineResult<StagedTree> {
        let dest = self.settings.unit_dir(unit);
        let mut stager = WorkTreeStager::new(self.vcs, &self.settings.preserve);
        if let Some(build_dir) = self.settings.build_dir_in_project() {
            stager = stager.exclude(build_dir);
        }
        let mut tree = stager.stage(&unit.version, &dest)?;
        tree.set_target(unit.variant, unit.channel)?;
        info!(unit = %unit, dir = %dest, "created dist");
        Ok(tree)
    }

    /// Compile the UI, bundle the licence and write the manifest into a staged tree.
    pub fn build_dist(&self, unit: &BuildUnit) -> PipelineResult<StagedTree> {
        let dir = self.settings.unit_dir(unit);
        let mut tree = StagedTree::open(&dir, StageState::Staged, &unit.version)?;
        let module_dir = tree.module_dir(&self.props.module_name);
        if !module_dir.is_dir() {
            return Err(PipelineError::NotStaged {
                dir,
                required: StageState::Staged,
                reason: format!("module directory src/{} is missing", self.props.module_name),
            });
        }

        let designer_dir = tree.root().join(&self.settings.designer_dir);
        let forms = ui::compile_forms(self.ui, &designer_dir, &module_dir, unit.variant)?;
        if !forms.is_empty() {
            ui::write_shim(&module_dir, &[unit.variant])?;
        }

        let license = tree.root().join(LICENSE_FILE);
        if license.is_file() {
            let bundled = module_dir.join(BUNDLED_LICENSE_FILE);
            fs::copy(&license, &bundled).with_context(|| format!("copy {license}"))?;
            debug!(%bundled, "bundled licence");
        }

        let synthesizer = ManifestSynthesizer::new(self.props);
        let manifest = synthesizer.synthesize(&unit.version, unit.channel)?;
        synthesizer.write_into(&manifest, &tree)?;

        tree.set_state(StageState::Built)?;
        info!(unit = %unit, "built dist");
        Ok(tree)
    }

    pub fn package_dist(&self, unit: &BuildUnit) -> PipelineResult<PackageOutcome> {
        let dir = self.settings.unit_dir(unit);
        let tree = StagedTree::open(&dir, StageState::Built, &unit.version)?;
        Packager::new(&self.settings.build_dir).package(&tree, unit, &self.props.module_name)
    }

    /// `create_dist`, `build_dist` and `package_dist` in sequence.
    pub fn build(&self, unit: &BuildUnit) -> PipelineResult<PackageOutcome> {
        self.create_dist(unit)?;
        self.build_dist(unit)?;
        self.package_dist(unit)
    }

    /// Drive `stage` over every unit in order. A failed unit is logged and the
    /// run moves on to the next one.
    pub fn run(&self, stage: Stage, units: &[BuildUnit]) -> RunReport {
        let total = units.len();
        let mut report = RunReport::default();
        for (i, unit) in units.iter().enumerate() {
            info!("=== Build task {}/{}: {} ===", i + 1, total, unit);
            let result = match stage {
                Stage::Create => self.create_dist(unit).map(|_| None),
                Stage::Build => self.build_dist(unit).map(|_| None),
                Stage::Package => self.package_dist(unit).map(Some),
                Stage::All => self.build(unit).map(Some),
            };
            if let Err(err) = &result {
                warn!(unit = %unit, error = %err, "build unit failed");
            }
            report.outcomes.push(UnitOutcome {
                unit: unit.clone(),
                result,
            });
        }
        report
    }

    /// Compile designer files into the working copy for each variant and
    /// write the forms shim. Returns the variants that produced forms.
    pub fn compile_working_copy_ui(
        &self,
        variants: &[ToolkitVariant],
    ) -> PipelineResult<Vec<ToolkitVariant>> {
        let root = &self.settings.project_root;
        let designer_dir = root.join(&self.settings.designer_dir);
        let module_dir = root.join("src").join(&self.props.module_name);

        let mut compiled = Vec::new();
        for (i, variant) in variants.iter().enumerate() {
            info!("=== Build task {}/{}: {} ===", i + 1, variants.len(), variant);
            if !ui::compile_forms(self.ui, &designer_dir, &module_dir, *variant)?.is_empty() {
                compiled.push(*variant);
            }
        }
        if !compiled.is_empty() {
            info!("=== Writing Qt compatibility shim ===");
            ui::write_shim(&module_dir, &compiled)?;
        }
        Ok(compiled)
    }

    /// Write the manifest for `channel` into the working copy module directory.
    pub fn write_working_copy_manifest(
        &self,
        version: &ResolvedVersion,
        channel: Channel,
    ) -> PipelineResult<Utf8PathBuf> {
        let module_dir = self
            .settings
            .project_root
            .join("src")
            .join(&self.props.module_name);
        let manifest = ManifestSynthesizer::new(self.props).synthesize(version, channel)?;
        let path = write_to_dir(&manifest, &module_dir)?;
        info!(%path, %channel, "wrote manifest");
        Ok(path)
    }
}
