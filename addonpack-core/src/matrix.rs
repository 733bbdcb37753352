//! Expansion of variant/channel selectors into concrete targets.
//!
//! Raw selector strings are normalized first ([`normalize_variant`],
//! [`parse_channel`]); deprecated aliases are rewritten there and never reach
//! [`TargetMatrix::expand`], which is pure and order-preserving.

use crate::error::{PipelineError, PipelineResult};
use addonpack_types::{BuildUnit, Channel, ResolvedVersion, ToolkitVariant};

/// Legacy catch-all target name, accepted as a synonym for `all`.
pub const DEPRECATED_ALL_ALIAS: &str = "anki21";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantSelector {
    One(ToolkitVariant),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSelector {
    One(Channel),
    All,
}

/// Notice returned when a deprecated alias was rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deprecation {
    pub alias: &'static str,
    pub replacement: &'static str,
}

impl Deprecation {
    pub fn message(&self) -> String {
        format!(
            "'{}' is deprecated as a target type; use '{}' to target both qt5 and qt6",
            self.alias, self.replacement
        )
    }
}

/// Parse a raw target selector, rewriting the deprecated alias to `all`.
pub fn normalize_variant(raw: &str) -> PipelineResult<(VariantSelector, Option<Deprecation>)> {
    match raw {
        "all" => Ok((VariantSelector::All, None)),
        DEPRECATED_ALL_ALIAS => Ok((
            VariantSelector::All,
            Some(Deprecation {
                alias: DEPRECATED_ALL_ALIAS,
                replacement: "all",
            }),
        )),
        other => ToolkitVariant::from_name(other)
            .map(|v| (VariantSelector::One(v), None))
            .ok_or_else(|| PipelineError::InvalidSelector {
                kind: "target",
                value: other.to_string(),
            }),
    }
}

pub fn parse_channel(raw: &str) -> PipelineResult<ChannelSelector> {
    match raw {
        "all" => Ok(ChannelSelector::All),
        other => Channel::from_name(other)
            .map(ChannelSelector::One)
            .ok_or_else(|| PipelineError::InvalidSelector {
                kind: "dist",
                value: other.to_string(),
            }),
    }
}

pub struct TargetMatrix;

impl TargetMatrix {
    /// Expand selectors variant-major: every channel of the first variant, then
    /// every channel of the next.
    pub fn expand(
        variants: VariantSelector,
        channels: ChannelSelector,
    ) -> Vec<(ToolkitVariant, Channel)> {
        let variants: &[ToolkitVariant] = match &variants {
            VariantSelector::One(v) => std::slice::from_ref(v),
            VariantSelector::All => &ToolkitVariant::ALL,
        };
        let channels: &[Channel] = match &channels {
            ChannelSelector::One(c) => std::slice::from_ref(c),
            ChannelSelector::All => &Channel::ALL,
        };
        variants
            .iter()
            .flat_map(|v| channels.iter().map(move |c| (*v, *c)))
            .collect()
    }

    /// The single channel a manifest is generated for; `all` is ambiguous.
    pub fn manifest_channel(channels: ChannelSelector) -> PipelineResult<Channel> {
        match channels {
            ChannelSelector::One(c) => Ok(c),
            ChannelSelector::All => Err(PipelineError::AmbiguousChannel),
        }
    }

    /// Pair every expanded target with the same resolved version.
    pub fn units(
        variants: VariantSelector,
        channels: ChannelSelector,
        version: &ResolvedVersion,
    ) -> Vec<BuildUnit> {
        Self::expand(variants, channels)
            .into_iter()
            .map(|(v, c)| BuildUnit::new(v, c, version.clone()))
            .collect()
    }
}
