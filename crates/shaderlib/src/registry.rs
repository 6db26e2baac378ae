//! Built-in shader programs and the closed id space that names them.
//!
//! Types:
//!
//! - `ShaderId` is the validated handle the rest of the workspace passes
//!   around; raw integers (preferences, CLI flags, canvas props) are converted
//!   at the boundary through `ShaderId::from_raw`.
//! - `ShaderDefinition` is one immutable registry entry.
//!
//! Functions:
//!
//! - `definitions` returns the registry in display order.
//! - `lookup` resolves a raw id, returning `None` for ids outside the registry.
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Shared vertex stage: consumes the full-screen quad attribute `position`.
pub const VERTEX_SOURCE: &str = include_str!("../shaders/quad.vert");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ShaderId {
    FlowingWaves = 1,
    Ether = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no shader registered under id {0}")]
pub struct UnknownShader(pub i64);

impl ShaderId {
    pub const ALL: [ShaderId; 2] = [ShaderId::FlowingWaves, ShaderId::Ether];
    pub const DEFAULT: ShaderId = ShaderId::FlowingWaves;

    pub fn raw(self) -> u32 {
        self as u32
    }

    pub fn from_raw(raw: i64) -> Result<Self, UnknownShader> {
        match raw {
            1 => Ok(ShaderId::FlowingWaves),
            2 => Ok(ShaderId::Ether),
            other => Err(UnknownShader(other)),
        }
    }

    /// Resolves an optional raw id, falling back to [`ShaderId::DEFAULT`]
    /// when it is absent or unknown.
    pub fn or_default(raw: Option<i64>) -> Self {
        raw.and_then(|raw| Self::from_raw(raw).ok())
            .unwrap_or(Self::DEFAULT)
    }

    pub fn slug(self) -> &'static str {
        match self {
            ShaderId::FlowingWaves => "flowing-waves",
            ShaderId::Ether => "ether",
        }
    }

    pub fn definition(self) -> &'static ShaderDefinition {
        match self {
            ShaderId::FlowingWaves => &REGISTRY[0],
            ShaderId::Ether => &REGISTRY[1],
        }
    }
}

impl TryFrom<i64> for ShaderId {
    type Error = UnknownShader;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

impl fmt::Display for ShaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{0}` is neither a shader id nor a shader name")]
pub struct ParseShaderIdError(String);

impl FromStr for ShaderId {
    type Err = ParseShaderIdError;

    /// Accepts the numeric id (`2`) or the slug (`ether`).
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if let Ok(raw) = trimmed.parse::<i64>() {
            return Self::from_raw(raw).map_err(|_| ParseShaderIdError(input.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|id| id.slug().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseShaderIdError(input.to_string()))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ShaderDefinition {
    pub id: ShaderId,
    pub name: &'static str,
    pub fragment_source: &'static str,
    /// Accent colour used by selector chrome, `#rrggbb`.
    pub accent_color: &'static str,
}

static REGISTRY: [ShaderDefinition; 2] = [
    ShaderDefinition {
        id: ShaderId::FlowingWaves,
        name: "Flowing Waves",
        fragment_source: include_str!("../shaders/flowing_waves.frag"),
        accent_color: "#8b5cf6",
    },
    ShaderDefinition {
        id: ShaderId::Ether,
        name: "Ether",
        fragment_source: include_str!("../shaders/ether.frag"),
        accent_color: "#8b5cf6",
    },
];

pub fn definitions() -> &'static [ShaderDefinition] {
    &REGISTRY
}

pub fn lookup(raw: i64) -> Option<&'static ShaderDefinition> {
    ShaderId::from_raw(raw).ok().map(ShaderId::definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_ordered_by_id() {
        let ids: Vec<u32> = definitions().iter().map(|def| def.id.raw()).collect();
        assert_eq!(ids, vec![1, 2]);
        for id in ShaderId::ALL {
            assert_eq!(id.definition().id, id);
        }
    }

    #[test]
    fn unknown_ids_are_rejected() {
        assert!(lookup(0).is_none());
        assert!(lookup(999).is_none());
        assert_eq!(ShaderId::from_raw(-1), Err(UnknownShader(-1)));
        assert_eq!(lookup(2).map(|def| def.name), Some("Ether"));
    }

    #[test]
    fn or_default_falls_back_to_flowing_waves() {
        assert_eq!(ShaderId::or_default(None), ShaderId::FlowingWaves);
        assert_eq!(ShaderId::or_default(Some(42)), ShaderId::FlowingWaves);
        assert_eq!(ShaderId::or_default(Some(2)), ShaderId::Ether);
    }

    #[test]
    fn parses_numbers_and_slugs() {
        assert_eq!("2".parse::<ShaderId>(), Ok(ShaderId::Ether));
        assert_eq!("Flowing-Waves".parse::<ShaderId>(), Ok(ShaderId::FlowingWaves));
        assert!("7".parse::<ShaderId>().is_err());
        assert!("plasma".parse::<ShaderId>().is_err());
    }

    #[test]
    fn sources_use_the_shared_uniform_names() {
        assert!(VERTEX_SOURCE.contains("attribute vec2 position"));
        for def in definitions() {
            assert!(def.fragment_source.contains("void main()"), "{}", def.name);
            assert!(def.fragment_source.contains("uniform float iTime;"));
            assert!(def.fragment_source.contains("gl_FragColor"));
            assert!(def.accent_color.starts_with('#'));
        }
    }
}
