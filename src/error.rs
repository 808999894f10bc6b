// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Error types.

use std::io;
use thiserror::Error;

/// An invalid [`FanConfig`](crate::config::FanConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fan curve has no points")]
    EmptyCurve,

    #[error("curve point {index} has speed {speed}, expected 0.0..=1.0")]
    SpeedOutOfRange { index: usize, speed: f64 },

    #[error("curve point {index} has a non-finite temperature")]
    NonFiniteTemperature { index: usize },

    #[error("curve point {index} is colder than the point before it")]
    DecreasingTemperature { index: usize },

    #[error("{which} must be a positive number, got {value}")]
    InvalidRampRate { which: &'static str, value: f64 },

    #[error("update interval must be non-zero")]
    ZeroInterval,

    #[error("unknown scheduling mode '{0}'")]
    UnknownSchedulingMode(String),

    #[error("failed to read config: {0}")]
    Read(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// A failure reported by a temperature source or speed actuator.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("device error: {0}")]
    Device(String),

    #[error("temperature source returned {0}")]
    InvalidReading(f64),

    /// The operation was abandoned; ends the loop without being a failure.
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors from building or running a
/// [`SoftwareFanController`](crate::controller::SoftwareFanController).
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid fan config: {0}")]
    Config(#[from] ConfigError),

    #[error("no {0} supplied")]
    MissingCollaborator(&'static str),

    #[error("async task scheduling requires a running tokio runtime")]
    NoRuntime,

    #[error("fan control loop failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("failed to start fan control thread: {0}")]
    Spawn(io::Error),

    #[error("fan control loop panicked")]
    Panicked,
}
