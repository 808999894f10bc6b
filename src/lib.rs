// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Software fan controller.
//!
//! Reads a temperature, maps it through a piecewise-linear curve, slews the
//! commanded speed toward that target at bounded ramp rates and pushes the
//! result to an actuator, once per interval, until stopped.
//!
//! Hardware access is injected through [`provider::TemperatureSource`] and
//! [`provider::SpeedActuator`].

pub mod config;
pub mod controller;
pub mod curve;
pub mod error;
pub mod priority;
pub mod provider;
pub mod ramp;

pub use config::{FanConfig, SchedulingMode};
pub use controller::{ControllerBuilder, SoftwareFanController};
pub use curve::FanPoint;
pub use error::{ConfigError, ControllerError, ProviderError};
pub use provider::{SpeedActuator, TemperatureSource};
