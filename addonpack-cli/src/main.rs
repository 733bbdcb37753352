mod config;

use addonpack_core::clean::clean;
use addonpack_core::matrix::{TargetMatrix, VariantSelector, normalize_variant, parse_channel};
use addonpack_core::{BuildPipeline, PipelineError, ShellGit, Stage};
use addonpack_types::{AddonProperties, ToolkitVariant, VersionRef};
use anyhow::Context;
use camino::Utf8PathBuf;
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use config::{ConfigMerger, MergedConfig};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "addonpack",
    version,
    about = "Stage, build and package Anki add-ons for Qt5/Qt6 and local/AnkiWeb distribution."
)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    /// Add-on project root (default: current directory).
    #[arg(long, global = true, default_value = ".")]
    project_root: Utf8PathBuf,

    /// Build output directory (default: <project_root>/build, or [build] dir in addonpack.toml).
    #[arg(long, global = true)]
    build_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build and package add-on for distribution.
    Build(UnitArgs),
    /// Compile add-on user interface files into the working copy.
    Ui(TargetArgs),
    /// Generate manifest.json in the working copy from addon.json.
    Manifest(ManifestArgs),
    /// Remove build output and leftover Python bytecode.
    Clean,
    /// Stage the source tree under <build_dir>/dist. Run before `build_dist` and `package_dist`.
    #[command(name = "create_dist", visible_alias = "create-dist")]
    CreateDist(UnitArgs),
    /// Compile the UI and write the manifest into a staged tree.
    #[command(name = "build_dist", visible_alias = "build-dist")]
    BuildDist(UnitArgs),
    /// Package a built tree into a distributable archive.
    #[command(name = "package_dist", visible_alias = "package-dist")]
    PackageDist(UnitArgs),
}

#[derive(Debug, Args)]
struct VersionArg {
    /// Version to build as a git reference (e.g. 'v1.2.0' or 'd338f6405').
    /// Keywords: 'dev' (working copy), 'current' (latest commit), 'release' (latest tag).
    #[arg(value_name = "VERSION", default_value = "release")]
    reference: String,
}

#[derive(Debug, Args)]
struct TargetArgs {
    /// Anki release type to build for. 'all' (deprecated alias: 'anki21') targets both Qt5 and Qt6.
    #[arg(
        short,
        long,
        default_value = "all",
        value_parser = PossibleValuesParser::new(["qt5", "qt6", "all", "anki21"])
    )]
    target: String,
}

#[derive(Debug, Args)]
struct DistArgs {
    /// Distribution channel to build for.
    #[arg(
        short,
        long,
        default_value = "local",
        value_parser = PossibleValuesParser::new(["local", "ankiweb", "all"])
    )]
    dist: String,
}

#[derive(Debug, Args)]
struct UnitArgs {
    #[command(flatten)]
    version: VersionArg,
    #[command(flatten)]
    target: TargetArgs,
    #[command(flatten)]
    dist: DistArgs,
}

#[derive(Debug, Args)]
struct ManifestArgs {
    #[command(flatten)]
    version: VersionArg,
    #[command(flatten)]
    dist: DistArgs,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn real_main() -> anyhow::Result<u8> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = cli.project_root;
    let file_config = config::load_or_default(&root).context("load addonpack.toml config")?;
    let merged = ConfigMerger::new(file_config).merge(&root, cli.build_dir)?;
    debug!(
        "merged config: build_dir={}, preserve={:?}, designer_dir={}",
        merged.settings.build_dir, merged.settings.preserve, merged.settings.designer_dir
    );

    if let Command::Clean = cli.cmd {
        let report = clean(&merged.settings)?;
        info!("removed {} path(s)", report.removed.len());
        return Ok(0);
    }

    config::validate_project_root(&root)?;
    let props = config::load_properties(&root)?;
    let project = Project { merged, props };

    match cli.cmd {
        Command::Build(args) => project.run_units(Stage::All, args),
        Command::CreateDist(args) => project.run_units(Stage::Create, args),
        Command::BuildDist(args) => project.run_units(Stage::Build, args),
        Command::PackageDist(args) => project.run_units(Stage::Package, args),
        Command::Ui(args) => project.ui(args),
        Command::Manifest(args) => project.manifest(args),
        Command::Clean => Ok(0),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Everything a command needs once the project root has been validated.
struct Project {
    merged: MergedConfig,
    props: AddonProperties,
}

impl Project {
    fn with_pipeline<T>(&self, f: impl FnOnce(&BuildPipeline<'_>) -> T) -> T {
        let git = ShellGit::new(self.merged.settings.project_root.clone());
        let pipeline = BuildPipeline::new(
            &self.merged.settings,
            &self.props,
            &git,
            &self.merged.compiler,
        );
        f(&pipeline)
    }

    fn run_units(&self, stage: Stage, args: UnitArgs) -> anyhow::Result<u8> {
        let variants = variants(&args.target.target)?;
        let channels = parse_channel(&args.dist.dist)?;
        let reference = parse_version(&args.version.reference)?;

        self.with_pipeline(|pipeline| -> anyhow::Result<u8> {
            let version = pipeline.resolve(&reference)?;
            let units = TargetMatrix::units(variants, channels, &version);
            let report = pipeline.run(stage, &units);

            for archive in report.archives() {
                info!("wrote {}", archive.path);
            }
            let failed: Vec<_> = report.failures().collect();
            if failed.is_empty() {
                info!("{} build task(s) finished", report.outcomes.len());
            } else {
                for (unit, err) in &failed {
                    error!("{}: {:#}", unit, err);
                }
                error!(
                    "{} of {} build task(s) failed",
                    failed.len(),
                    report.outcomes.len()
                );
            }
            Ok(report.exit_code())
        })
    }

    fn ui(&self, args: TargetArgs) -> anyhow::Result<u8> {
        let selected: Vec<ToolkitVariant> = match variants(&args.target)? {
            VariantSelector::One(v) => vec![v],
            VariantSelector::All => ToolkitVariant::ALL.to_vec(),
        };
        let compiled = self.with_pipeline(|p| p.compile_working_copy_ui(&selected))?;
        if compiled.is_empty() {
            info!("no designer files under {}", self.merged.settings.designer_dir);
        }
        info!("Done.");
        Ok(0)
    }

    fn manifest(&self, args: ManifestArgs) -> anyhow::Result<u8> {
        let channel = TargetMatrix::manifest_channel(parse_channel(&args.dist.dist)?)?;
        let reference = parse_version(&args.version.reference)?;
        self.with_pipeline(|pipeline| -> anyhow::Result<u8> {
            let version = pipeline.resolve(&reference)?;
            pipeline.write_working_copy_manifest(&version, channel)?;
            Ok(0)
        })
    }
}

/// Normalize the target selector, warning once about deprecated aliases.
fn variants(raw: &str) -> anyhow::Result<VariantSelector> {
    let (selector, deprecation) = normalize_variant(raw)?;
    if let Some(notice) = deprecation {
        warn!("{}", notice.message());
    }
    Ok(selector)
}

fn parse_version(raw: &str) -> anyhow::Result<VersionRef> {
    raw.parse::<VersionRef>()
        .with_context(|| format!("invalid version '{raw}'"))
}
