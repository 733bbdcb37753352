use serde::{Deserialize, Serialize};

/// File name of the manifest inside the module directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Distributable manifest, derived from [`AddonProperties`](crate::AddonProperties)
/// and a resolved version for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Install identity: the module name locally, the hosted id on the hosted channel.
    pub package: String,

    pub name: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_point_version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_point_version: Option<u32>,

    /// Commit timestamp of the packaged revision.
    #[serde(rename = "mod", default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<i64>,
}

impl Manifest {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
