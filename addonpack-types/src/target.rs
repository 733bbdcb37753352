use crate::version::ResolvedVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// UI-toolkit runtime an add-on build is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolkitVariant {
    Qt5,
    Qt6,
}

impl ToolkitVariant {
    /// Every variant, in expansion order.
    pub const ALL: [ToolkitVariant; 2] = [ToolkitVariant::Qt5, ToolkitVariant::Qt6];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolkitVariant::Qt5 => "qt5",
            ToolkitVariant::Qt6 => "qt6",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == name)
    }
}

impl fmt::Display for ToolkitVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distribution destination with its own manifest and packaging rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Sideloaded package.
    #[serde(rename = "local")]
    Local,
    /// Package uploaded to the hosted add-on marketplace.
    #[serde(rename = "ankiweb")]
    Hosted,
}

impl Channel {
    /// Every channel, in expansion order.
    pub const ALL: [Channel; 2] = [Channel::Local, Channel::Hosted];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Local => "local",
            Channel::Hosted => "ankiweb",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One packaging job: a variant, a channel and a resolved version.
///
/// Units share nothing mutable; each stages into its own directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildUnit {
    pub variant: ToolkitVariant,
    pub channel: Channel,
    pub version: ResolvedVersion,
}

impl BuildUnit {
    pub fn new(variant: ToolkitVariant, channel: Channel, version: ResolvedVersion) -> Self {
        Self {
            variant,
            channel,
            version,
        }
    }

    /// Directory-safe label, e.g. `qt6-ankiweb`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.variant, self.channel)
    }
}

impl fmt::Display for BuildUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} @ {}", self.variant, self.channel, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_name() {
        for v in ToolkitVariant::ALL {
            assert_eq!(ToolkitVariant::from_name(v.as_str()), Some(v));
        }
        for c in Channel::ALL {
            assert_eq!(Channel::from_name(c.as_str()), Some(c));
        }
        assert_eq!(ToolkitVariant::from_name("all"), None);
        assert_eq!(Channel::from_name("hosted"), None);
    }

    #[test]
    fn unit_label_and_display() {
        let unit = BuildUnit::new(
            ToolkitVariant::Qt6,
            Channel::Hosted,
            ResolvedVersion::live(None),
        );
        assert_eq!(unit.label(), "qt6-ankiweb");
        assert_eq!(unit.to_string(), "qt6/ankiweb @ 0.0.0+dev");
    }

    #[test]
    fn channel_serializes_with_wire_names() {
        assert_eq!(
            serde_json::to_string(&Channel::Hosted).unwrap(),
            "\"ankiweb\""
        );
        assert_eq!(
            serde_json::to_string(&ToolkitVariant::Qt5).unwrap(),
            "\"qt5\""
        );
    }
}
