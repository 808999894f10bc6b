// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Temperature input and fan speed output capabilities.
//!
//! The controller owns no hardware. It calls these traits once per tick, from
//! whichever context the scheduling mode picks. With the thread modes that is
//! a different OS thread than the one that built the controller, hence the
//! `Send + Sync` bounds.
//!
//! Both calls may be dropped mid-flight when the controller is stopped, so
//! implementations must be safe to cancel at any `.await`.

use crate::error::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of the input temperature.
#[async_trait]
pub trait TemperatureSource: Send + Sync {
    /// Current temperature in degrees Celsius.
    async fn get_temperature(&self) -> Result<f64, ProviderError>;
}

/// Applies a commanded fan speed.
#[async_trait]
pub trait SpeedActuator: Send + Sync {
    /// Set the fan speed as a fraction in 0.0..=1.0.
    async fn set_speed(&self, speed: f64) -> Result<(), ProviderError>;
}

#[async_trait]
impl<T: TemperatureSource + ?Sized> TemperatureSource for Arc<T> {
    async fn get_temperature(&self) -> Result<f64, ProviderError> {
        (**self).get_temperature().await
    }
}

#[async_trait]
impl<T: SpeedActuator + ?Sized> SpeedActuator for Arc<T> {
    async fn set_speed(&self, speed: f64) -> Result<(), ProviderError> {
        (**self).set_speed(speed).await
    }
}
