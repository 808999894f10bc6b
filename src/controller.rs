// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! The software fan control loop.
//!
//! Every tick reads the temperature, evaluates the curve, ramp-limits toward
//! the result and, if the speed moved, pushes it to the actuator. The same
//! `drive` future runs under every
//! [`SchedulingMode`](crate::config::SchedulingMode); the mode only picks
//! where it is polled.

use crate::config::FanConfig;
use crate::curve::{self, FanPoint};
use crate::error::{ControllerError, ProviderError};
use crate::priority::{self, ThreadPriority};
use crate::provider::{SpeedActuator, TemperatureSource};
use crate::ramp::{self, RampStep};
use std::sync::Arc;
use std::thread;
use tokio::runtime::{self, Handle};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};

const THREAD_NAME: &str = "fan-controller";

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects the config and both collaborators, then starts the loop.
pub struct ControllerBuilder {
    config: FanConfig,
    source: Option<Arc<dyn TemperatureSource>>,
    actuator: Option<Arc<dyn SpeedActuator>>,
}

impl ControllerBuilder {
    /// Start a builder for `config`. Both collaborators must be set before
    /// [`start`](Self::start).
    pub fn new(config: FanConfig) -> Self {
        Self {
            config,
            source: None,
            actuator: None,
        }
    }

    /// Set the temperature source read once per tick.
    pub fn temperature_source(mut self, source: impl TemperatureSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Set the actuator that receives each new fan speed.
    pub fn actuator(mut self, actuator: impl SpeedActuator + 'static) -> Self {
        self.actuator = Some(Arc::new(actuator));
        self
    }

    /// Validate and start polling.
    ///
    /// Nothing is spawned when this fails. `AsyncTask` mode must be called
    /// from within a tokio runtime; the thread modes bring their own.
    pub fn start(self) -> Result<SoftwareFanController, ControllerError> {
        self.config.validate()?;
        let source = self
            .source
            .ok_or(ControllerError::MissingCollaborator("temperature source"))?;
        let actuator = self
            .actuator
            .ok_or(ControllerError::MissingCollaborator("speed actuator"))?;

        let mode = self.config.scheduling_mode;
        let control = ControlLoop {
            curve: self.config.curve,
            ramp_up_speed: self.config.ramp_up_speed,
            ramp_down_speed: self.config.ramp_down_speed,
            interval: self.config.interval,
            source,
            actuator,
            current_speed: None,
            last_tick: None,
        };

        log::info!(
            "Starting software fan controller: mode={mode}, interval={:?}, {} curve point(s)",
            control.interval,
            control.curve.len()
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let driver = match ThreadPriority::for_mode(mode) {
            None => spawn_task(control, stop_rx)?,
            Some(priority) => spawn_thread(control, stop_rx, priority)?,
        };

        Ok(SoftwareFanController {
            stop_tx,
            driver: Some(driver),
        })
    }
}

// ---------------------------------------------------------------------------
// Controller handle
// ---------------------------------------------------------------------------

/// A running control loop.
///
/// The temperature source and actuator are called from the loop's own
/// context: a tokio task, or a dedicated OS thread in the thread modes.
/// Call [`stop`](Self::stop) to end it; a stopped controller cannot be
/// restarted.
pub struct SoftwareFanController {
    stop_tx: watch::Sender<bool>,
    driver: Option<Driver>,
}

enum Driver {
    Task(JoinHandle<Result<(), ControllerError>>),
    Thread {
        handle: thread::JoinHandle<Result<(), ControllerError>>,
        exited: oneshot::Receiver<()>,
    },
}

impl SoftwareFanController {
    /// Same as [`ControllerBuilder::new`].
    pub fn builder(config: FanConfig) -> ControllerBuilder {
        ControllerBuilder::new(config)
    }

    /// Shorthand for the builder with both collaborators supplied.
    pub fn start(
        config: FanConfig,
        source: impl TemperatureSource + 'static,
        actuator: impl SpeedActuator + 'static,
    ) -> Result<Self, ControllerError> {
        Self::builder(config)
            .temperature_source(source)
            .actuator(actuator)
            .start()
    }

    /// True once the loop has exited, whether stopped or failed.
    ///
    /// A loop that ends on its own hit a provider error; [`stop`](Self::stop)
    /// returns it.
    pub fn is_finished(&self) -> bool {
        match &self.driver {
            None => true,
            Some(Driver::Task(handle)) => handle.is_finished(),
            Some(Driver::Thread { handle, .. }) => handle.is_finished(),
        }
    }

    /// Signal the loop to stop and wait for it to exit.
    ///
    /// No actuator call happens after this returns. A clean stop is `Ok`;
    /// if the loop had already died on a provider error, that error is
    /// returned. Later calls do nothing and return `Ok`.
    pub async fn stop(&mut self) -> Result<(), ControllerError> {
        let Some(driver) = self.driver.take() else {
            return Ok(());
        };

        self.stop_tx.send_replace(true);

        let result = match driver {
            Driver::Task(handle) => match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Ok(()),
                Err(_) => Err(ControllerError::Panicked),
            },
            Driver::Thread { handle, exited } => {
                // Resolves on exit, including a panic that drops the sender.
                let _ = exited.await;
                handle.join().unwrap_or(Err(ControllerError::Panicked))
            }
        };

        log::info!("Software fan controller stopped");
        result
    }
}

impl Drop for SoftwareFanController {
    fn drop(&mut self) {
        if self.driver.is_some() {
            log::warn!("Software fan controller dropped without stop(), signalling loop to exit");
            self.stop_tx.send_replace(true);
        }
    }
}

fn spawn_task(
    control: ControlLoop,
    stop: watch::Receiver<bool>,
) -> Result<Driver, ControllerError> {
    let handle = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;
    Ok(Driver::Task(handle.spawn(drive(control, stop))))
}

fn spawn_thread(
    control: ControlLoop,
    stop: watch::Receiver<bool>,
    priority: ThreadPriority,
) -> Result<Driver, ControllerError> {
    let (exited_tx, exited) = oneshot::channel();

    let handle = thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || {
            match priority::apply_to_current_thread(priority) {
                Ok(()) => log::debug!("Fan control thread running at {priority:?} priority"),
                Err(e) => log::warn!(
                    "Could not raise fan control thread to {priority:?} priority: {e}, \
                     continuing at normal priority"
                ),
            }
            // Built here so the runtime is also dropped on this thread.
            let result = match runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt.block_on(drive(control, stop)),
                Err(e) => {
                    log::error!("Failed to build fan control runtime: {e}");
                    Err(ControllerError::Spawn(e))
                }
            };
            let _ = exited_tx.send(());
            result
        })
        .map_err(ControllerError::Spawn)?;

    Ok(Driver::Thread { handle, exited })
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Loop state. Only the driving future touches it.
struct ControlLoop {
    curve: Vec<FanPoint>,
    ramp_up_speed: f64,
    ramp_down_speed: f64,
    interval: Duration,
    source: Arc<dyn TemperatureSource>,
    actuator: Arc<dyn SpeedActuator>,
    /// Last speed handed to the actuator; `None` until the first tick.
    current_speed: Option<f64>,
    last_tick: Option<Instant>,
}

impl ControlLoop {
    async fn tick(&mut self) -> Result<(), ProviderError> {
        let now = Instant::now();
        let elapsed = self
            .last_tick
            .replace(now)
            .map_or(0.0, |prev| now.duration_since(prev).as_secs_f64());

        let temperature = self.source.get_temperature().await?;
        if !temperature.is_finite() {
            return Err(ProviderError::InvalidReading(temperature));
        }

        let target = curve::evaluate(&self.curve, temperature);
        let step = ramp::limit(
            self.current_speed,
            target,
            elapsed,
            self.ramp_up_speed,
            self.ramp_down_speed,
        );

        match step {
            RampStep::Hold => {
                log::trace!("{temperature:.1}C -> target {target:.3}, holding");
            }
            RampStep::Apply(speed) => {
                self.actuator.set_speed(speed).await?;
                self.current_speed = Some(speed);
                log::debug!("{temperature:.1}C -> target {target:.3}, fan set to {speed:.3}");
            }
        }
        Ok(())
    }
}

/// Sleep, tick, repeat until `stop` flips or a provider fails.
///
/// A stop request wins over both the sleep and an in-flight tick; the tick
/// future is dropped and its result never applied.
async fn drive(
    mut control: ControlLoop,
    mut stop: watch::Receiver<bool>,
) -> Result<(), ControllerError> {
    loop {
        if *stop.borrow_and_update() {
            break;
        }

        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = time::sleep(control.interval) => {}
        }

        let result = tokio::select! {
            biased;
            _ = stop.changed() => break,
            result = control.tick() => result,
        };

        match result {
            Ok(()) => {}
            Err(ProviderError::Cancelled) => {
                log::info!("Fan provider cancelled, ending control loop");
                break;
            }
            Err(e) => {
                log::error!("Fan control loop terminated: {e}");
                return Err(e.into());
            }
        }
    }

    log::debug!("Fan control loop exited");
    Ok(())
}
