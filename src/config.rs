// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Controller configuration.
//!
//! A [`FanConfig`] holds the curve, ramp limits, update interval and
//! scheduling mode. It can be loaded from TOML; validation happens when a
//! controller is built from it.
//! Default path: `/etc/fanctl/software-fan.toml`

use crate::curve::{self, FanPoint};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fanctl/software-fan.toml";

/// Default update interval in milliseconds (three updates per second).
pub const DEFAULT_INTERVAL_MS: u64 = 333;

/// Default maximum speed increase per second.
pub const DEFAULT_RAMP_UP_SPEED: f64 = 0.2;

/// Default maximum speed decrease per second.
pub const DEFAULT_RAMP_DOWN_SPEED: f64 = 0.03;

// ---------------------------------------------------------------------------
// Scheduling mode
// ---------------------------------------------------------------------------

/// Where the control loop runs.
///
/// Config files and the command line accept the same names: see the
/// [`FromStr`] impl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum SchedulingMode {
    /// A task on the ambient tokio runtime.
    AsyncTask,
    /// A dedicated thread at default priority.
    NormalThread,
    /// A dedicated thread at raised priority.
    #[default]
    AboveNormalThread,
    /// A dedicated thread at the highest priority we ask for.
    HighestThread,
}

impl SchedulingMode {
    pub const ALL: [SchedulingMode; 4] = [
        SchedulingMode::AsyncTask,
        SchedulingMode::NormalThread,
        SchedulingMode::AboveNormalThread,
        SchedulingMode::HighestThread,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SchedulingMode::AsyncTask => "async_task",
            SchedulingMode::NormalThread => "normal_thread",
            SchedulingMode::AboveNormalThread => "above_normal_thread",
            SchedulingMode::HighestThread => "highest_thread",
        }
    }
}

impl fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownSchedulingMode(s.to_string()))
    }
}

impl TryFrom<String> for SchedulingMode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Config type
// ---------------------------------------------------------------------------

/// Software fan controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanConfig {
    /// Time between updates.
    #[serde(rename = "interval_ms", with = "duration_ms", default = "default_interval")]
    pub interval: Duration,

    /// Maximum speed increase per second.
    #[serde(default = "default_ramp_up_speed")]
    pub ramp_up_speed: f64,

    /// Maximum speed decrease per second.
    #[serde(default = "default_ramp_down_speed")]
    pub ramp_down_speed: f64,

    #[serde(default)]
    pub scheduling_mode: SchedulingMode,

    /// Curve points in non-decreasing temperature order. Kept last so TOML
    /// output puts the `[[curve]]` tables after the plain keys.
    #[serde(default = "curve::default_linear_curve")]
    pub curve: Vec<FanPoint>,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            ramp_up_speed: DEFAULT_RAMP_UP_SPEED,
            ramp_down_speed: DEFAULT_RAMP_DOWN_SPEED,
            scheduling_mode: SchedulingMode::default(),
            curve: curve::default_linear_curve(),
        }
    }
}

impl FanConfig {
    /// Check everything the controller relies on.
    ///
    /// The curve must be non-empty, every speed within 0.0..=1.0, and
    /// temperatures finite and never decreasing. Ramp rates must be positive
    /// and finite, and the interval non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.curve.is_empty() {
            return Err(ConfigError::EmptyCurve);
        }

        for (index, point) in self.curve.iter().enumerate() {
            if !point.temperature.is_finite() {
                return Err(ConfigError::NonFiniteTemperature { index });
            }
            if !(0.0..=1.0).contains(&point.speed) {
                return Err(ConfigError::SpeedOutOfRange {
                    index,
                    speed: point.speed,
                });
            }
            if index > 0 && point.temperature < self.curve[index - 1].temperature {
                return Err(ConfigError::DecreasingTemperature { index });
            }
        }

        check_rate("ramp_up_speed", self.ramp_up_speed)?;
        check_rate("ramp_down_speed", self.ramp_down_speed)?;

        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load config from a TOML file, or return the default if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<FanConfig, ConfigError> {
    if !path.exists() {
        log::info!("No config file at {}, using defaults", path.display());
        return Ok(FanConfig::default());
    }

    let contents = fs::read_to_string(path)?;
    let config = parse_config(&contents)?;

    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Parse a TOML document into a config. Missing fields take their defaults.
pub fn parse_config(contents: &str) -> Result<FanConfig, ConfigError> {
    toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Resolve the config file path from CLI arg or default.
pub fn resolve_config_path(cli_path: Option<&str>) -> PathBuf {
    cli_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_rate(which: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRampRate { which, value })
    }
}

fn default_interval() -> Duration {
    Duration::from_millis(DEFAULT_INTERVAL_MS)
}

fn default_ramp_up_speed() -> f64 {
    DEFAULT_RAMP_UP_SPEED
}

fn default_ramp_down_speed() -> f64 {
    DEFAULT_RAMP_DOWN_SPEED
}

/// Serialize a [`Duration`] as whole milliseconds, rounding up so a non-zero
/// interval never becomes zero.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = value.as_nanos().div_ceil(1_000_000);
        serializer.serialize_u64(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_point() -> FanConfig {
        FanConfig {
            curve: vec![FanPoint::new(0.0, 0.0), FanPoint::new(100.0, 1.0)],
            interval: Duration::from_millis(50),
            ramp_up_speed: 1.0,
            ramp_down_speed: 1.0,
            scheduling_mode: SchedulingMode::AsyncTask,
        }
    }

    #[test]
    fn test_default_is_valid() {
        let cfg = FanConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.interval, Duration::from_millis(333));
        assert_eq!(cfg.scheduling_mode, SchedulingMode::AboveNormalThread);
    }

    #[test]
    fn test_single_point_curve_is_valid() {
        let cfg = FanConfig {
            curve: vec![FanPoint::new(20.0, 0.3)],
            ..two_point()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_curve() {
        let cfg = FanConfig {
            curve: Vec::new(),
            ..two_point()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyCurve)));
    }

    #[test]
    fn test_validation_speed_out_of_range() {
        let mut cfg = two_point();
        cfg.curve[1].speed = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::SpeedOutOfRange { index: 1, .. })
        ));

        cfg.curve[1].speed = -0.1;
        assert!(cfg.validate().is_err());

        cfg.curve[1].speed = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validation_ramp_rates() {
        for bad in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            let cfg = FanConfig {
                ramp_up_speed: bad,
                ..two_point()
            };
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidRampRate { which: "ramp_up_speed", .. })
            ));

            let cfg = FanConfig {
                ramp_down_speed: bad,
                ..two_point()
            };
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidRampRate { which: "ramp_down_speed", .. })
            ));
        }
    }

    #[test]
    fn test_validation_temperature_order() {
        let cfg = FanConfig {
            curve: vec![
                FanPoint::new(10.0, 0.1),
                FanPoint::new(60.0, 0.5),
                FanPoint::new(40.0, 0.9),
            ],
            ..two_point()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DecreasingTemperature { index: 2 })
        ));

        let cfg = FanConfig {
            curve: vec![FanPoint::new(f64::NAN, 0.1)],
            ..two_point()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonFiniteTemperature { index: 0 })
        ));
    }

    #[test]
    fn test_validation_zero_interval() {
        let cfg = FanConfig {
            interval: Duration::ZERO,
            ..two_point()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroInterval)));
    }

    #[test]
    fn test_scheduling_mode_from_str() {
        assert_eq!("async_task".parse::<SchedulingMode>().unwrap(), SchedulingMode::AsyncTask);
        assert_eq!(
            "Highest-Thread".parse::<SchedulingMode>().unwrap(),
            SchedulingMode::HighestThread
        );
        for mode in SchedulingMode::ALL {
            assert_eq!(mode.to_string().parse::<SchedulingMode>().unwrap(), mode);
        }
        assert!(matches!(
            "realtime".parse::<SchedulingMode>(),
            Err(ConfigError::UnknownSchedulingMode(name)) if name == "realtime"
        ));
    }

    #[test]
    fn test_parse_full_config() {
        let cfg = parse_config(
            r#"
            interval_ms = 500
            ramp_up_speed = 0.5
            ramp_down_speed = 0.05
            scheduling_mode = "normal_thread"

            [[curve]]
            temperature = 40.0
            speed = 0.2

            [[curve]]
            temperature = 90.0
            speed = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(cfg.interval, Duration::from_millis(500));
        assert_eq!(cfg.ramp_up_speed, 0.5);
        assert_eq!(cfg.ramp_down_speed, 0.05);
        assert_eq!(cfg.scheduling_mode, SchedulingMode::NormalThread);
        assert_eq!(
            cfg.curve,
            vec![FanPoint::new(40.0, 0.2), FanPoint::new(90.0, 1.0)]
        );
    }

    #[test]
    fn test_parse_fills_defaults() {
        let cfg = parse_config("ramp_up_speed = 0.4\n").unwrap();
        assert_eq!(cfg.ramp_up_speed, 0.4);
        assert_eq!(cfg.ramp_down_speed, DEFAULT_RAMP_DOWN_SPEED);
        assert_eq!(cfg.curve, curve::default_linear_curve());
        assert_eq!(cfg.scheduling_mode, SchedulingMode::AboveNormalThread);
    }

    #[test]
    fn test_parse_unknown_mode() {
        let err = parse_config("scheduling_mode = \"realtime\"\n").unwrap_err();
        match err {
            ConfigError::Parse(message) => {
                assert!(message.contains("unknown scheduling mode 'realtime'"), "{message}");
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_file_and_cli_accept_same_mode_names() {
        for name in ["highest_thread", "Highest-Thread", " NORMAL_THREAD "] {
            let from_cli: SchedulingMode = name.parse().unwrap();
            let from_file = parse_config(&format!("scheduling_mode = \"{name}\"\n"))
                .unwrap()
                .scheduling_mode;
            assert_eq!(from_file, from_cli, "{name}");
        }
    }

    #[test]
    fn test_default_survives_toml() {
        let text = toml::to_string_pretty(&FanConfig::default()).unwrap();
        assert!(text.contains("interval_ms = 333"));
        assert_eq!(parse_config(&text).unwrap(), FanConfig::default());
    }

    #[test]
    fn test_sub_millisecond_interval_rounds_up() {
        let cfg = FanConfig {
            interval: Duration::from_micros(500),
            ..two_point()
        };
        assert!(cfg.validate().is_ok());

        let reloaded = parse_config(&toml::to_string_pretty(&cfg).unwrap()).unwrap();
        assert_eq!(reloaded.interval, Duration::from_millis(1));
        assert!(reloaded.validate().is_ok());

        let cfg = FanConfig {
            interval: Duration::from_micros(1500),
            ..two_point()
        };
        let reloaded = parse_config(&toml::to_string_pretty(&cfg).unwrap()).unwrap();
        assert_eq!(reloaded.interval, Duration::from_millis(2));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, FanConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fan.toml");
        fs::write(&path, "interval_ms = 1000\nscheduling_mode = \"async_task\"\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(1));
        assert_eq!(cfg.scheduling_mode, SchedulingMode::AsyncTask);
    }

    #[test]
    fn test_resolve_config_path() {
        assert_eq!(resolve_config_path(None), PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(resolve_config_path(Some("/tmp/x.toml")), PathBuf::from("/tmp/x.toml"));
    }
}
