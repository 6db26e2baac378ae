use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Scene configuration for the scroll-reactive background.
///
/// Every table is optional; an empty document (apart from `version`) yields
/// the values the portfolio front-end ships with.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SceneConfig {
    pub version: u32,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub transitions: TransitionConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: 1,
            scroll: ScrollConfig::default(),
            transitions: TransitionConfig::default(),
            canvas: CanvasConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Number of page sections the scroll range is split into.
    pub sections: u32,
    pub intensity_base: f32,
    pub intensity_amplitude: f32,
    pub scale_base: f32,
    pub scale_range: f32,
    /// Top vignette shows once progress exceeds this value.
    pub top_vignette_after: f32,
    /// Bottom vignette shows while progress stays below this value.
    pub bottom_vignette_until: f32,
    pub tints: Vec<TintConfig>,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            sections: 5,
            intensity_base: 0.25,
            intensity_amplitude: 0.05,
            scale_base: 1.1,
            scale_range: 0.1,
            top_vignette_after: 0.1,
            bottom_vignette_until: 0.9,
            tints: default_tints(),
        }
    }
}

fn default_tints() -> Vec<TintConfig> {
    vec![
        TintConfig {
            section: 1,
            color: RgbColor::new(139, 92, 246),
            alpha: 0.08,
        },
        TintConfig {
            section: 2,
            color: RgbColor::new(6, 182, 212),
            alpha: 0.08,
        },
        TintConfig {
            section: 3,
            color: RgbColor::new(16, 185, 129),
            alpha: 0.08,
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TintConfig {
    pub section: u32,
    pub color: RgbColor,
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransitionConfig {
    #[serde(
        default = "default_opacity_transition",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub opacity: Duration,
    #[serde(
        default = "default_tint_transition",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub tint: Duration,
    #[serde(
        default = "default_vignette_transition",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub vignette: Duration,
    #[serde(default)]
    pub curve: CurveSetting,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            opacity: default_opacity_transition(),
            tint: default_tint_transition(),
            vignette: default_vignette_transition(),
            curve: CurveSetting::default(),
        }
    }
}

fn default_opacity_transition() -> Duration {
    Duration::from_secs(1)
}

fn default_tint_transition() -> Duration {
    Duration::from_secs(2)
}

fn default_vignette_transition() -> Duration {
    Duration::from_millis(500)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurveSetting {
    Linear,
    Smoothstep,
    #[default]
    EaseInOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Shader id used when no preference has been stored yet.
    pub default_shader: u32,
    pub thumbnail_size: u32,
    pub interactive: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            default_shader: 1,
            thumbnail_size: 48,
            interactive: false,
        }
    }
}

/// 8-bit sRGB colour written as `#rrggbb`, `rgb(r, g, b)` or `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Normalised `[0, 1]` channels for shader uniforms.
    pub fn to_unit(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

impl FromStr for RgbColor {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| format!("invalid hex colour '{raw}'"));
        }
        if let Some(body) = trimmed
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let channels: Vec<&str> = body.split(',').map(str::trim).collect();
            if let [r, g, b] = channels.as_slice() {
                let parse = |value: &str| {
                    value
                        .parse::<u8>()
                        .map_err(|err| format!("invalid channel '{value}' in '{raw}': {err}"))
                };
                return Ok(Self::new(parse(*r)?, parse(*g)?, parse(*b)?));
            }
        }
        Err(format!(
            "invalid colour '{raw}'; expected '#rrggbb' or 'rgb(r, g, b)'"
        ))
    }
}

fn parse_hex(hex: &str) -> Option<RgbColor> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(RgbColor::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for RgbColor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Str(String),
            Channels([i64; 3]),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Str(raw) => raw.parse().map_err(de::Error::custom),
            Helper::Channels(channels) => {
                let mut out = [0u8; 3];
                for (slot, value) in out.iter_mut().zip(channels) {
                    *slot = u8::try_from(value).map_err(|_| {
                        de::Error::custom(format!("colour channel {value} outside 0-255"))
                    })?;
                }
                Ok(RgbColor::new(out[0], out[1], out[2]))
            }
        }
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Tint configured for a section, if any.
    pub fn tint_for(&self, section: u32) -> Option<&TintConfig> {
        self.scroll.tints.iter().find(|tint| tint.section == section)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let scroll = &self.scroll;
        if scroll.sections == 0 {
            return Err(ConfigError::Invalid(
                "scroll.sections must be at least 1".into(),
            ));
        }

        for (name, value) in [
            ("scroll.top_vignette_after", scroll.top_vignette_after),
            ("scroll.bottom_vignette_until", scroll.bottom_vignette_until),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 0..=1, got {value}"
                )));
            }
        }

        for (name, value) in [
            ("scroll.intensity_base", scroll.intensity_base),
            ("scroll.intensity_amplitude", scroll.intensity_amplitude),
            ("scroll.scale_base", scroll.scale_base),
            ("scroll.scale_range", scroll.scale_range),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if scroll.intensity_base + scroll.intensity_amplitude > 1.0 {
            return Err(ConfigError::Invalid(
                "scroll.intensity_base + scroll.intensity_amplitude must not exceed 1".into(),
            ));
        }

        let mut seen = Vec::with_capacity(scroll.tints.len());
        for tint in &scroll.tints {
            if tint.section == 0 || tint.section >= scroll.sections {
                return Err(ConfigError::Invalid(format!(
                    "tint section {} must be within 1..{}",
                    tint.section, scroll.sections
                )));
            }
            if !(0.0..=1.0).contains(&tint.alpha) {
                return Err(ConfigError::Invalid(format!(
                    "tint section {} alpha must be within 0..=1",
                    tint.section
                )));
            }
            if seen.contains(&tint.section) {
                return Err(ConfigError::Invalid(format!(
                    "tint section {} declared more than once",
                    tint.section
                )));
            }
            seen.push(tint.section);
        }

        if self.canvas.thumbnail_size == 0 {
            return Err(ConfigError::Invalid(
                "canvas.thumbnail_size must be greater than zero".into(),
            ));
        }

        if self.canvas.default_shader == 0 {
            return Err(ConfigError::Invalid(
                "canvas.default_shader must be a positive shader id".into(),
            ));
        }

        Ok(())
    }
}
