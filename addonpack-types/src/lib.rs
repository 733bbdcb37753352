//! Shared DTOs for the addonpack workspace.
//!
//! # Design constraints
//! - The stage marker and manifest are written to disk and read back by
//!   separate process runs, so their serialized shape is a contract.
//! - Prefer adding optional fields over changing semantics.

pub mod manifest;
pub mod properties;
pub mod stage;
pub mod target;
pub mod version;

pub use manifest::Manifest;
pub use properties::AddonProperties;
pub use stage::{StageMarker, StageState};
pub use target::{BuildUnit, Channel, ToolkitVariant};
pub use version::{ResolvedVersion, VersionOrigin, VersionRef};

/// Schema identifiers.
pub mod schema {
    pub const ADDONPACK_STAGE_V1: &str = "addonpack.stage.v1";
}
