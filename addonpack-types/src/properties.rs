use serde::{Deserialize, Deserializer, Serialize};

/// Declarative add-on identity, read from `addon.json`.
///
/// Read once per run and passed around by reference; nothing in the pipeline
/// writes it back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonProperties {
    /// Python package directory under `src/`.
    pub module_name: String,

    /// Human-readable add-on name.
    #[serde(alias = "name")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,

    /// Numeric id on the hosted channel. Accepts a JSON number or string.
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub ankiweb_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_anki_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_anki_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tested_anki_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright_start: Option<u32>,
}

impl AddonProperties {
    pub fn new(module_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    /// Parse `addon.json` contents.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(u64),
        Text(String),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        None => None,
        Some(RawId::Num(n)) => Some(n.to_string()),
        Some(RawId::Text(s)) if s.trim().is_empty() => None,
        Some(RawId::Text(s)) => Some(s.trim().to_string()),
    })
}

/// Convert an application release string into its integer point version.
///
/// `2.1.50` maps to `50`; calendar releases such as `23.10` or `24.06.3` map to
/// `231000` and `240603`.
pub fn point_version(release: &str) -> Option<u32> {
    let parts: Vec<u32> = release
        .trim()
        .split('.')
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;
    let calendar = |year: u32, month: u32, patch: u32| {
        year.checked_mul(10_000)?
            .checked_add(month.checked_mul(100)?)?
            .checked_add(patch)
    };
    match parts.as_slice() {
        [2, 1, point] => Some(*point),
        [year, month] if *year >= 23 => calendar(*year, *month, 0),
        [year, month, patch] if *year >= 23 => calendar(*year, *month, *patch),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_properties() {
        let props =
            AddonProperties::from_json(r#"{"module_name": "demo", "name": "Demo Add-on"}"#)
                .unwrap();
        assert_eq!(props, AddonProperties::new("demo", "Demo Add-on"));
    }

    #[test]
    fn hosted_id_accepts_number_or_string() {
        let num = AddonProperties::from_json(
            r#"{"module_name": "m", "display_name": "M", "ankiweb_id": 123456}"#,
        )
        .unwrap();
        assert_eq!(num.ankiweb_id.as_deref(), Some("123456"));

        let text = AddonProperties::from_json(
            r#"{"module_name": "m", "display_name": "M", "ankiweb_id": " 42 "}"#,
        )
        .unwrap();
        assert_eq!(text.ankiweb_id.as_deref(), Some("42"));

        let blank = AddonProperties::from_json(
            r#"{"module_name": "m", "display_name": "M", "ankiweb_id": ""}"#,
        )
        .unwrap();
        assert_eq!(blank.ankiweb_id, None);

        let null = AddonProperties::from_json(
            r#"{"module_name": "m", "display_name": "M", "ankiweb_id": null}"#,
        )
        .unwrap();
        assert_eq!(null.ankiweb_id, None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let props = AddonProperties::from_json(
            r#"{"module_name": "m", "display_name": "M", "ankiweb_id": 1, "extra": {"a": 1}}"#,
        )
        .unwrap();
        assert_eq!(props.module_name, "m");
    }

    #[test]
    fn point_versions() {
        assert_eq!(point_version("2.1.50"), Some(50));
        assert_eq!(point_version("23.10"), Some(231000));
        assert_eq!(point_version("24.06.3"), Some(240603));
        assert_eq!(point_version("2.0.52"), None);
        assert_eq!(point_version("latest"), None);
    }

    #[test]
    fn oversized_calendar_release_has_no_point_version() {
        assert_eq!(point_version("500000.1"), None);
        assert_eq!(point_version("429496.72.96"), None);
        assert_eq!(point_version("23.4294967295"), None);
        assert_eq!(point_version("429496.72.95"), Some(u32::MAX));
        assert_eq!(point_version("429495.0"), Some(4_294_950_000));
    }
}
