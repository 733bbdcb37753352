//! On-disk shape of the manifest and stage marker.

use addonpack_types::manifest::MANIFEST_FILE;
use addonpack_types::{
    Channel, Manifest, ResolvedVersion, StageMarker, StageState, ToolkitVariant, VersionOrigin,
};
use pretty_assertions::assert_eq;
use semver::Version;
use serde_json::json;

#[test]
fn manifest_omits_empty_optionals_and_renames_mod() {
    let manifest = Manifest {
        package: "demo".to_string(),
        name: "Demo Add-on".to_string(),
        version: "1.2.0".to_string(),
        author: None,
        homepage: None,
        conflicts: vec![],
        min_point_version: Some(50),
        max_point_version: None,
        modified: Some(1_700_000_000),
    };

    let value = serde_json::to_value(&manifest).unwrap();
    assert_eq!(
        value,
        json!({
            "package": "demo",
            "name": "Demo Add-on",
            "version": "1.2.0",
            "min_point_version": 50,
            "mod": 1_700_000_000,
        })
    );
    assert_eq!(MANIFEST_FILE, "manifest.json");
}

#[test]
fn stage_marker_records_origin_and_state() {
    let mut marker = StageMarker::new(ResolvedVersion::committed(
        Version::new(1, 2, 0),
        "0123456789abcdef0123456789abcdef01234567",
        0,
        42,
    ));
    marker.state = StageState::Built;
    marker.variant = Some(ToolkitVariant::Qt6);
    marker.channel = Some(Channel::Hosted);

    let value = serde_json::to_value(&marker).unwrap();
    assert_eq!(value["schema"], "addonpack.stage.v1");
    assert_eq!(value["state"], "built");
    assert_eq!(value["variant"], "qt6");
    assert_eq!(value["channel"], "ankiweb");
    assert_eq!(value["version"]["version"], "1.2.0");
    assert_eq!(value["version"]["origin"]["kind"], "committed");
    assert_eq!(value["version"]["origin"]["committed_at"], 42);

    let back: StageMarker = serde_json::from_value(value).unwrap();
    assert_eq!(back, marker);
}

#[test]
fn live_marker_has_no_commit() {
    let marker = StageMarker::new(ResolvedVersion::live(Some(Version::new(2, 0, 0))));
    let value = serde_json::to_value(&marker).unwrap();
    assert_eq!(value["version"]["version"], "2.0.0+dev");
    assert_eq!(value["version"]["origin"], json!({ "kind": "live" }));

    let back: StageMarker = serde_json::from_value(value).unwrap();
    assert_eq!(back.version.origin, VersionOrigin::Live);
    assert_eq!(back.state, StageState::Staging);
}
