//! Derive the distributable manifest from add-on properties.

use crate::error::{PipelineError, PipelineResult};
use crate::stager::StagedTree;
use addonpack_types::manifest::MANIFEST_FILE;
use addonpack_types::properties::point_version;
use addonpack_types::{AddonProperties, Channel, Manifest, ResolvedVersion};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::{debug, warn};

/// Pure mapping of properties, version and channel to a [`Manifest`].
pub struct ManifestSynthesizer<'a> {
    props: &'a AddonProperties,
}

impl<'a> ManifestSynthesizer<'a> {
    pub fn new(props: &'a AddonProperties) -> Self {
        Self { props }
    }

    pub fn synthesize(
        &self,
        version: &ResolvedVersion,
        channel: Channel,
    ) -> PipelineResult<Manifest> {
        let props = self.props;
        let mut conflicts: Vec<String> = Vec::new();

        let package = match channel {
            Channel::Local => {
                for c in &props.conflicts {
                    if Some(c) != props.ankiweb_id.as_ref() && !conflicts.contains(c) {
                        conflicts.push(c.clone());
                    }
                }
                props.module_name.clone()
            }
            Channel::Hosted => {
                let id = self.hosted_id()?;
                for c in props.conflicts.iter().chain(std::iter::once(&props.module_name)) {
                    if *c != id && !conflicts.contains(c) {
                        conflicts.push(c.clone());
                    }
                }
                id
            }
        };

        Ok(Manifest {
            package,
            name: props.display_name.clone(),
            version: version.version.to_string(),
            author: props.author.clone(),
            homepage: props.homepage.clone(),
            conflicts,
            min_point_version: self.point("min_anki_version", props.min_anki_version.as_deref()),
            max_point_version: self.point("max_anki_version", props.max_anki_version.as_deref()),
            modified: version.committed_at(),
        })
    }

    /// Write into the module directory of a staged tree, replacing any prior manifest.
    pub fn write_into(&self, manifest: &Manifest, tree: &StagedTree) -> PipelineResult<Utf8PathBuf> {
        write_to_dir(manifest, &tree.module_dir(&self.props.module_name))
    }

    fn hosted_id(&self) -> PipelineResult<String> {
        let id = self
            .props
            .ankiweb_id
            .as_ref()
            .ok_or_else(|| PipelineError::MissingHostedId {
                module: self.props.module_name.clone(),
            })?;
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(PipelineError::InvalidHostedId { value: id.clone() });
        }
        Ok(id.clone())
    }

    fn point(&self, field: &str, release: Option<&str>) -> Option<u32> {
        let release = release?;
        let point = point_version(release);
        if point.is_none() {
            warn!(field, release, "not a recognised application version; omitted from manifest");
        }
        point
    }
}

/// Write `manifest` as `manifest.json` inside `dir`, which must exist.
pub fn write_to_dir(manifest: &Manifest, dir: &Utf8Path) -> PipelineResult<Utf8PathBuf> {
    let path = dir.join(MANIFEST_FILE);
    let json = manifest.to_json_pretty().context("serialize manifest")?;
    fs::write(&path, json).with_context(|| format!("write {path}"))?;
    debug!(%path, package = %manifest.package, "manifest written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use semver::Version;

    fn props() -> AddonProperties {
        AddonProperties {
            author: Some("Jane".to_string()),
            homepage: Some("https://example.org".to_string()),
            ankiweb_id: Some("123456".to_string()),
            conflicts: vec!["other".to_string(), "123456".to_string()],
            min_anki_version: Some("2.1.50".to_string()),
            max_anki_version: Some("24.06".to_string()),
            ..AddonProperties::new("demo", "Demo")
        }
    }

    fn release() -> ResolvedVersion {
        ResolvedVersion::committed(Version::new(1, 2, 0), "abcdef0123456789", 0, 1_700_000_000)
    }

    #[test]
    fn local_manifest_uses_module_name_and_hides_hosted_id() {
        let props = props();
        let m = ManifestSynthesizer::new(&props)
            .synthesize(&release(), Channel::Local)
            .unwrap();
        assert_eq!(
            m,
            Manifest {
                package: "demo".to_string(),
                name: "Demo".to_string(),
                version: "1.2.0".to_string(),
                author: Some("Jane".to_string()),
                homepage: Some("https://example.org".to_string()),
                conflicts: vec!["other".to_string()],
                min_point_version: Some(50),
                max_point_version: Some(240600),
                modified: Some(1_700_000_000),
            }
        );
        assert!(!m.to_json_pretty().unwrap().contains("123456"));
    }

    #[test]
    fn hosted_manifest_uses_id_and_conflicts_with_local_module() {
        let props = props();
        let m = ManifestSynthesizer::new(&props)
            .synthesize(&release(), Channel::Hosted)
            .unwrap();
        assert_eq!(m.package, "123456");
        assert_eq!(m.conflicts, vec!["other", "demo"]);
    }

    #[test]
    fn hosted_requires_numeric_id() {
        let mut props = AddonProperties::new("demo", "Demo");
        let err = ManifestSynthesizer::new(&props)
            .synthesize(&release(), Channel::Hosted)
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingHostedId { ref module } if module == "demo"));

        props.ankiweb_id = Some("12ab".to_string());
        let err = ManifestSynthesizer::new(&props)
            .synthesize(&release(), Channel::Hosted)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidHostedId { .. }));

        // the local channel never needs it
        ManifestSynthesizer::new(&props)
            .synthesize(&release(), Channel::Local)
            .unwrap();
    }

    #[test]
    fn live_version_has_no_modification_time() {
        let props = AddonProperties::new("demo", "Demo");
        let m = ManifestSynthesizer::new(&props)
            .synthesize(&ResolvedVersion::live(Some(Version::new(1, 2, 0))), Channel::Local)
            .unwrap();
        assert_eq!(m.version, "1.2.0+dev");
        assert_eq!(m.modified, None);
        assert_eq!(m.min_point_version, None);
    }

    #[test]
    fn unparseable_application_version_is_omitted() {
        let props = AddonProperties {
            min_anki_version: Some("latest".to_string()),
            ..AddonProperties::new("demo", "Demo")
        };
        let m = ManifestSynthesizer::new(&props)
            .synthesize(&release(), Channel::Local)
            .unwrap();
        assert_eq!(m.min_point_version, None);
    }

    #[test]
    fn oversized_application_version_is_omitted() {
        let props = AddonProperties {
            min_anki_version: Some("500000.1".to_string()),
            max_anki_version: Some("24.06".to_string()),
            ..AddonProperties::new("demo", "Demo")
        };
        let m = ManifestSynthesizer::new(&props)
            .synthesize(&release(), Channel::Local)
            .unwrap();
        assert_eq!(m.min_point_version, None);
        assert_eq!(m.max_point_version, Some(240600));
    }
}
