use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::GpioError;
use crate::validate::Bound;

pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GpioConfig {
    pub root: PathBuf,
    pub bound: Bound,
    pub event_wait_timeout_ms: u64,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_GPIO_ROOT),
            bound: Bound::default(),
            event_wait_timeout_ms: 10,
        }
    }
}

impl GpioConfig {
    pub fn event_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.event_wait_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ChaseConfig {
    pub leds: Vec<u32>,
    pub input: Option<u32>,
    pub step_ms: u64,
    pub start_delay_ms: u64,
    pub event_capacity: usize,
}

impl Default for ChaseConfig {
    fn default() -> Self {
        Self {
            leds: vec![4, 17, 27, 22, 5, 6, 13, 19],
            input: Some(26),
            step_ms: 500,
            start_delay_ms: 1000,
            event_capacity: 64,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub gpio: GpioConfig,
    pub chase: ChaseConfig,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GpioError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| GpioError::Config(format!("Failed to read config: {e}")))?;
        let config: AppConfig = serde_json::from_str(&contents)
            .map_err(|e| GpioError::Config(format!("Invalid config json: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GpioError> {
        Bound::new(self.gpio.bound.low, self.gpio.bound.high)?;
        if self.chase.step_ms == 0 {
            return Err(GpioError::Config("chase.step_ms must be positive".into()));
        }
        if self.chase.event_capacity == 0 {
            return Err(GpioError::Config(
                "chase.event_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}
