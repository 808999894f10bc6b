// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! fanctl-sim: runs the software fan controller against a simulated heat
//! source so curves, ramp rates and scheduling modes can be tried without
//! touching hardware.

use async_trait::async_trait;
use clap::Parser;
use software_fan_control::config::{self, FanConfig, SchedulingMode};
use software_fan_control::{ProviderError, SoftwareFanController, SpeedActuator, TemperatureSource};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{self, Duration, Instant};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "fanctl-sim", about = "Software fan controller simulator")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: Option<String>,

    /// Override the scheduling mode (async_task, normal_thread,
    /// above_normal_thread, highest_thread).
    #[arg(short, long)]
    mode: Option<SchedulingMode>,

    /// How long to run, in seconds.
    #[arg(short, long, default_value_t = 30)]
    duration: u64,

    /// Ambient temperature in C.
    #[arg(long, default_value_t = 25.0)]
    ambient: f64,

    /// Heat load in watts.
    #[arg(long, default_value_t = 45.0)]
    load: f64,

    /// Make the simulated sensor fail after this many seconds.
    #[arg(long)]
    sensor_fails_after: Option<u64>,

    /// Print the default config as TOML and exit.
    #[arg(long)]
    dump_config: bool,
}

// ---------------------------------------------------------------------------
// Thermal model
// ---------------------------------------------------------------------------

/// Heat capacity in J/C.
const HEAT_CAPACITY: f64 = 60.0;
/// Passive conductance to ambient in W/C, fan stopped.
const PASSIVE_CONDUCTANCE: f64 = 0.3;
/// Extra conductance at full fan speed in W/C.
const FAN_CONDUCTANCE: f64 = 1.7;

/// A single lumped thermal mass heated by `load` and cooled by the fan.
struct ThermalModel {
    temperature: f64,
    ambient: f64,
    load: f64,
    fan_speed: f64,
    updated: Instant,
}

impl ThermalModel {
    fn new(ambient: f64, load: f64) -> Self {
        Self {
            temperature: ambient,
            ambient,
            load,
            fan_speed: 0.0,
            updated: Instant::now(),
        }
    }

    fn advance(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.updated).as_secs_f64();
        self.updated = now;

        let conductance = PASSIVE_CONDUCTANCE + FAN_CONDUCTANCE * self.fan_speed;
        let net_watts = self.load - conductance * (self.temperature - self.ambient);
        self.temperature += net_watts * dt / HEAT_CAPACITY;
    }
}

type SharedModel = Arc<Mutex<ThermalModel>>;

struct SimSensor {
    model: SharedModel,
    fails_at: Option<Instant>,
}

#[async_trait]
impl TemperatureSource for SimSensor {
    async fn get_temperature(&self) -> Result<f64, ProviderError> {
        if self.fails_at.is_some_and(|at| Instant::now() >= at) {
            return Err(ProviderError::Device("simulated sensor failure".to_string()));
        }
        let mut model = self.model.lock().await;
        model.advance();
        Ok(model.temperature)
    }
}

struct SimFan {
    model: SharedModel,
}

#[async_trait]
impl SpeedActuator for SimFan {
    async fn set_speed(&self, speed: f64) -> Result<(), ProviderError> {
        let mut model = self.model.lock().await;
        model.advance();
        model.fan_speed = speed.clamp(0.0, 1.0);
        log::info!(
            "Fan -> {:5.1}% at {:.1}C",
            model.fan_speed * 100.0,
            model.temperature
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.dump_config {
        print!("{}", toml::to_string_pretty(&FanConfig::default())?);
        return Ok(());
    }

    let config_path = config::resolve_config_path(cli.config.as_deref());
    let mut cfg = config::load_config(&config_path).unwrap_or_else(|e| {
        log::warn!("Could not load config: {e}, using defaults");
        FanConfig::default()
    });
    if let Some(mode) = cli.mode {
        cfg.scheduling_mode = mode;
    }

    let model: SharedModel = Arc::new(Mutex::new(ThermalModel::new(cli.ambient, cli.load)));
    let sensor = SimSensor {
        model: model.clone(),
        fails_at: cli
            .sensor_fails_after
            .map(|secs| Instant::now() + Duration::from_secs(secs)),
    };
    let fan = SimFan {
        model: model.clone(),
    };

    let mut controller = match SoftwareFanController::start(cfg, sensor, fan) {
        Ok(controller) => controller,
        Err(e) => {
            log::error!("Cannot enter software fan mode: {e}");
            apply_safe_fallback(&model).await;
            return Err(e.into());
        }
    };

    let ctrl_c = tokio::signal::ctrl_c();
    let deadline = time::sleep(Duration::from_secs(cli.duration));
    tokio::pin!(ctrl_c, deadline);
    let mut report = time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                log::info!("Received shutdown signal");
                break;
            }
            _ = &mut deadline => {
                log::info!("Simulation finished");
                break;
            }
            _ = report.tick() => {
                if controller.is_finished() {
                    break;
                }
                let mut m = model.lock().await;
                m.advance();
                log::debug!("Temperature {:.1}C, fan {:.1}%", m.temperature, m.fan_speed * 100.0);
            }
        }
    }

    if let Err(e) = controller.stop().await {
        log::error!("Software fan control failed: {e}");
        apply_safe_fallback(&model).await;
    }

    Ok(())
}

/// Leave the fan somewhere safe when software control is unavailable.
async fn apply_safe_fallback(model: &SharedModel) {
    let mut m = model.lock().await;
    m.advance();
    m.fan_speed = 1.0;
    log::warn!("Falling back to full fan speed");
}
