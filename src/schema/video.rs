//! Video generation parameters
//!
//! Every field is optional on the wire. Absent or null values take their defaults; values
//! that are present but outside the accepted domain are rejected. `preset` is the exception:
//! an empty string is normalized to `custom` rather than rejected.

use crate::errors::{ErrorCode, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MIN_VIDEO_LENGTH: i64 = 5;
pub const MAX_VIDEO_LENGTH: i64 = 15;
pub const DEFAULT_VIDEO_LENGTH: u8 = 6;

/// `video_config` as received on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawVideoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_length: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "2:3")]
    TwoThree,
    #[default]
    #[serde(rename = "3:2")]
    ThreeTwo,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    NineSixteen,
    #[serde(rename = "16:9")]
    SixteenNine,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::TwoThree,
        AspectRatio::ThreeTwo,
        AspectRatio::Square,
        AspectRatio::NineSixteen,
        AspectRatio::SixteenNine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::TwoThree => "2:3",
            AspectRatio::ThreeTwo => "3:2",
            AspectRatio::Square => "1:1",
            AspectRatio::NineSixteen => "9:16",
            AspectRatio::SixteenNine => "16:9",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "SD")]
    Sd,
    #[serde(rename = "HD")]
    Hd,
}

impl Resolution {
    pub const ALL: [Resolution; 2] = [Resolution::Sd, Resolution::Hd];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Sd => "SD",
            Resolution::Hd => "HD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Fun,
    Normal,
    Spicy,
    #[default]
    Custom,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Fun, Preset::Normal, Preset::Spicy, Preset::Custom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Fun => "fun",
            Preset::Normal => "normal",
            Preset::Spicy => "spicy",
            Preset::Custom => "custom",
        }
    }
}

/// Resolved video parameters. `Default` yields 3:2, 6 seconds, SD, custom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConfig {
    pub aspect_ratio: AspectRatio,
    pub video_length: u8,
    pub resolution: Resolution,
    pub preset: Preset,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            video_length: DEFAULT_VIDEO_LENGTH,
            resolution: Resolution::default(),
            preset: Preset::default(),
        }
    }
}

impl TryFrom<RawVideoConfig> for VideoConfig {
    type Error = ValidationError;

    fn try_from(raw: RawVideoConfig) -> Result<Self, Self::Error> {
        let aspect_ratio = choose(
            raw.aspect_ratio.as_ref(),
            "aspect_ratio",
            &AspectRatio::ALL,
            AspectRatio::as_str,
            ErrorCode::InvalidAspectRatio,
        )?
        .unwrap_or_default();

        let video_length = match raw.video_length {
            None => DEFAULT_VIDEO_LENGTH,
            Some(value) => whole_seconds(&value)
                .filter(|secs| (MIN_VIDEO_LENGTH..=MAX_VIDEO_LENGTH).contains(secs))
                .and_then(|secs| u8::try_from(secs).ok())
                .ok_or_else(|| {
                    ValidationError::new(
                        format!(
                            "video_length must be between {} and {} seconds",
                            MIN_VIDEO_LENGTH, MAX_VIDEO_LENGTH
                        ),
                        "video_config.video_length",
                        ErrorCode::InvalidVideoLength,
                    )
                })?,
        };

        let resolution = choose(
            raw.resolution.as_ref(),
            "resolution",
            &Resolution::ALL,
            Resolution::as_str,
            ErrorCode::InvalidResolution,
        )?
        .unwrap_or_default();

        // An empty preset means custom; everywhere else "" is out of domain.
        let preset = match raw.preset {
            Some(Value::String(s)) if s.is_empty() => Preset::Custom,
            other => choose(
                other.as_ref(),
                "preset",
                &Preset::ALL,
                Preset::as_str,
                ErrorCode::InvalidPreset,
            )?
            .unwrap_or_default(),
        };

        Ok(VideoConfig {
            aspect_ratio,
            video_length,
            resolution,
            preset,
        })
    }
}

/// Looks up an enumerated field. `None` when the field was not supplied.
fn choose<T: Copy>(
    value: Option<&Value>,
    field: &str,
    options: &[T],
    name: fn(&T) -> &'static str,
    code: ErrorCode,
) -> Result<Option<T>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    pick(value, options, name).map(Some).ok_or_else(|| {
        ValidationError::new(
            format!("{field} must be one of {}", list(options, name)),
            format!("video_config.{field}"),
            code,
        )
    })
}

fn pick<T: Copy>(value: &Value, options: &[T], name: fn(&T) -> &'static str) -> Option<T> {
    let value = value.as_str()?;
    options.iter().copied().find(|option| name(option) == value)
}

fn list<T>(options: &[T], name: fn(&T) -> &'static str) -> String {
    options.iter().map(name).collect::<Vec<_>>().join(", ")
}

/// Integers, and floats with no fractional part, are accepted as seconds.
fn whole_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn convert(value: Value) -> Result<VideoConfig, ValidationError> {
        let raw: RawVideoConfig = serde_json::from_value(value).unwrap();
        VideoConfig::try_from(raw)
    }

    #[test]
    fn test_empty_config_takes_defaults() {
        let config = convert(json!({})).unwrap();
        assert_eq!(config, VideoConfig::default());
        assert_eq!(config.aspect_ratio.as_str(), "3:2");
        assert_eq!(config.video_length, 6);
        assert_eq!(config.resolution.as_str(), "SD");
        assert_eq!(config.preset.as_str(), "custom");
    }

    #[test]
    fn test_null_fields_take_defaults() {
        let config = convert(json!({
            "aspect_ratio": null,
            "video_length": null,
            "resolution": null,
            "preset": null
        }))
        .unwrap();
        assert_eq!(config, VideoConfig::default());
    }

    #[test]
    fn test_all_fields_set() {
        let config = convert(json!({
            "aspect_ratio": "9:16",
            "video_length": 10,
            "resolution": "HD",
            "preset": "spicy"
        }))
        .unwrap();
        assert_eq!(config.aspect_ratio, AspectRatio::NineSixteen);
        assert_eq!(config.video_length, 10);
        assert_eq!(config.resolution, Resolution::Hd);
        assert_eq!(config.preset, Preset::Spicy);
    }

    #[rstest]
    #[case(json!(5), true)]
    #[case(json!(15), true)]
    #[case(json!(8.0), true)]
    #[case(json!(4), false)]
    #[case(json!(16), false)]
    #[case(json!(-6), false)]
    #[case(json!(7.5), false)]
    #[case(json!("6"), false)]
    fn test_video_length_bounds(#[case] length: Value, #[case] accepted: bool) {
        let result = convert(json!({ "video_length": length }));
        if accepted {
            assert!(result.is_ok());
        } else {
            let err = result.unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidVideoLength);
            assert_eq!(err.param, "video_config.video_length");
        }
    }

    #[rstest]
    #[case(json!(""), Some(Preset::Custom))]
    #[case(json!("fun"), Some(Preset::Fun))]
    #[case(json!("normal"), Some(Preset::Normal))]
    #[case(json!("custom"), Some(Preset::Custom))]
    #[case(json!("wild"), None)]
    #[case(json!("Fun"), None)]
    #[case(json!(1), None)]
    fn test_preset_normalization(#[case] preset: Value, #[case] expected: Option<Preset>) {
        let result = convert(json!({ "preset": preset }));
        match expected {
            Some(preset) => assert_eq!(result.unwrap().preset, preset),
            None => {
                let err = result.unwrap_err();
                assert_eq!(err.code, ErrorCode::InvalidPreset);
                assert_eq!(err.param, "video_config.preset");
            }
        }
    }

    #[rstest]
    #[case(json!({"aspect_ratio": "4:3"}), ErrorCode::InvalidAspectRatio, "video_config.aspect_ratio")]
    #[case(json!({"aspect_ratio": ""}), ErrorCode::InvalidAspectRatio, "video_config.aspect_ratio")]
    #[case(json!({"aspect_ratio": 1.5}), ErrorCode::InvalidAspectRatio, "video_config.aspect_ratio")]
    #[case(json!({"resolution": "4K"}), ErrorCode::InvalidResolution, "video_config.resolution")]
    #[case(json!({"resolution": "sd"}), ErrorCode::InvalidResolution, "video_config.resolution")]
    fn test_out_of_domain_values_rejected(
        #[case] config: Value,
        #[case] code: ErrorCode,
        #[case] param: &str,
    ) {
        let err = convert(config).unwrap_err();
        assert_eq!(err.code, code);
        assert_eq!(err.param, param);
    }

    #[test]
    fn test_first_bad_field_wins() {
        let err = convert(json!({"aspect_ratio": "4:3", "video_length": 99})).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAspectRatio);
    }
}
