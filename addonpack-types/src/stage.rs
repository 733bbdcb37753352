use crate::target::{Channel, ToolkitVariant};
use crate::version::ResolvedVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker file written at the root of every staged tree.
pub const STAGE_MARKER_FILE: &str = ".addonpack-stage.json";

/// How far a staged tree has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Directory claimed; materialization in progress or interrupted.
    Staging,
    /// Source materialized, no transforms applied.
    Staged,
    /// UI compiled and manifest written; ready to package.
    Built,
}

impl StageState {
    pub fn as_str(self) -> &'static str {
        match self {
            StageState::Staging => "staging",
            StageState::Staged => "staged",
            StageState::Built => "built",
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record of a staged tree.
///
/// This is the only state that survives between separate `create_dist`,
/// `build_dist` and `package_dist` invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMarker {
    pub schema: String,
    pub version: ResolvedVersion,
    pub state: StageState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<ToolkitVariant>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
}

impl StageMarker {
    pub fn new(version: ResolvedVersion) -> Self {
        Self {
            schema: crate::schema::ADDONPACK_STAGE_V1.to_string(),
            version,
            state: StageState::Staging,
            variant: None,
            channel: None,
        }
    }
}
