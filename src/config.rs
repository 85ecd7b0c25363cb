//! Board configuration.
//!
//! A [`BoardConfig`] names the device and describes the state to put a
//! freshly opened board into. It is loaded from:
//! 1. Library defaults
//! 2. An optional TOML file
//! 3. Environment variables prefixed with `IDMF_` (nested keys split on `__`)
//!
//! # Example Configuration
//!
//! ```toml
//! device = "idmf0"
//!
//! [adc]
//! reference_adc_volts = 3.2768
//! reference_ina_volts = 4.0100
//! settle_us = 1
//! convert_us = 3
//!
//! [port]
//! x_output = true
//! y_output = false
//! z_output = false
//!
//! [gpio]
//! outputs = 0x0000FF
//!
//! [[encoders]]
//! channel = 0
//! mode = 4
//! ```

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::device::Board;
use crate::error::{IdmfError, Result};
use crate::registers::{NUM_ENCS, NUM_GPIOS};
use crate::subsystem::adc::{AdcTiming, ReferenceCounts, REFERENCE_FULL_SCALE_VOLTS};
use crate::subsystem::encoder::EncoderMode;
use crate::transport::RegisterTransport;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "IDMF_";

/// Top-level board configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Device name (`"idmf0"`) or path of the board's node
    #[serde(default = "default_device")]
    pub device: String,

    /// Analog input settings
    #[serde(default)]
    pub adc: AdcConfig,

    /// Digital port directions; left untouched when absent
    #[serde(default)]
    pub port: Option<PortConfig>,

    /// GPIO directions
    #[serde(default)]
    pub gpio: GpioConfig,

    /// Encoder counting modes
    #[serde(default)]
    pub encoders: Vec<EncoderConfig>,
}

/// Analog input configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdcConfig {
    /// ADC reference voltage (0 to 5 V)
    #[serde(default)]
    pub reference_adc_volts: Option<f64>,

    /// INA reference voltage (0 to 5 V)
    #[serde(default)]
    pub reference_ina_volts: Option<f64>,

    /// Delay between request and run, in microseconds
    #[serde(default = "default_settle_us")]
    pub settle_us: u64,

    /// Delay between run and acquire, in microseconds
    #[serde(default = "default_convert_us")]
    pub convert_us: u64,
}

/// Digital port directions; `true` is output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortConfig {
    /// Port X is an output
    #[serde(default)]
    pub x_output: bool,
    /// Port Y is an output
    #[serde(default)]
    pub y_output: bool,
    /// Port Z is an output
    #[serde(default)]
    pub z_output: bool,
}

/// GPIO configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GpioConfig {
    /// Direction mask, one bit per line (1 = output)
    #[serde(default)]
    pub outputs: Option<u32>,
}

/// Counting mode of one encoder channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Encoder channel (0-7)
    pub channel: u32,
    /// Counts per period: 1, 2 or 4
    pub mode: i32,
}

fn default_device() -> String {
    "idmf0".to_string()
}

fn default_settle_us() -> u64 {
    1
}

fn default_convert_us() -> u64 {
    3
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            adc: AdcConfig::default(),
            port: None,
            gpio: GpioConfig::default(),
            encoders: Vec::new(),
        }
    }
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            reference_adc_volts: None,
            reference_ina_volts: None,
            settle_us: default_settle_us(),
            convert_us: default_convert_us(),
        }
    }
}

impl AdcConfig {
    /// Acquisition delays.
    pub fn timing(&self) -> AdcTiming {
        AdcTiming {
            settle: Duration::from_micros(self.settle_us),
            convert: Duration::from_micros(self.convert_us),
        }
    }

    /// Reference counts, when both voltages are given.
    pub fn reference(&self) -> Option<ReferenceCounts> {
        match (self.reference_adc_volts, self.reference_ina_volts) {
            (Some(adc), Some(ina)) => Some(ReferenceCounts::from_volts(adc, ina)),
            _ => None,
        }
    }
}

impl BoardConfig {
    /// Configuration for `device` with everything else at defaults.
    pub fn for_device(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    /// Load defaults overridden by `IDMF_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::figment(None).extract().map_err(IdmfError::from)
    }

    /// Load defaults, then `path`, then `IDMF_*` environment variables.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = Self::figment(Some(path.as_ref()))
            .extract()
            .map_err(IdmfError::from)?;
        info!(path = %path.as_ref().display(), device = %config.device, "Loaded board configuration");
        Ok(config)
    }

    /// Parse a TOML document, without environment overrides.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            return Err(invalid("device name is empty".to_string()));
        }

        for (name, volts) in [
            ("reference_adc_volts", self.adc.reference_adc_volts),
            ("reference_ina_volts", self.adc.reference_ina_volts),
        ] {
            if let Some(v) = volts {
                if !(0.0..=REFERENCE_FULL_SCALE_VOLTS).contains(&v) {
                    return Err(invalid(format!(
                        "{} = {} is outside 0..={} V",
                        name, v, REFERENCE_FULL_SCALE_VOLTS
                    )));
                }
            }
        }
        if self.adc.reference_adc_volts.is_some() != self.adc.reference_ina_volts.is_some() {
            return Err(invalid(
                "reference_adc_volts and reference_ina_volts must be set together".to_string(),
            ));
        }

        if let Some(mask) = self.gpio.outputs {
            if mask >> NUM_GPIOS != 0 {
                return Err(invalid(format!(
                    "gpio.outputs = {:#x} has bits above line {}",
                    mask,
                    NUM_GPIOS - 1
                )));
            }
        }

        for enc in &self.encoders {
            if enc.channel as usize >= NUM_ENCS {
                return Err(invalid(format!(
                    "encoder channel {} out of range 0..{}",
                    enc.channel, NUM_ENCS
                )));
            }
            EncoderMode::try_from(enc.mode)?;
        }

        Ok(())
    }

    /// Put `board` into the configured state.
    ///
    /// Applies ADC timing, port and GPIO directions, encoder modes and the
    /// ADC references, in that order.
    pub fn apply<T: RegisterTransport>(&self, board: &mut Board<T>) {
        board.set_adc_timing(self.adc.timing());

        if let Some(port) = self.port {
            board
                .port()
                .configure(port.x_output, port.y_output, port.z_output);
        }

        if let Some(mask) = self.gpio.outputs {
            board.gpio().configure(mask);
        }

        for enc in &self.encoders {
            board
                .encoder()
                .configure_raw(i32::try_from(enc.channel).unwrap_or(i32::MAX), enc.mode);
        }

        if let Some(reference) = self.adc.reference() {
            board.adc().configure(reference.adc, reference.ina);
        }

        debug!(device = %self.device, "Applied board configuration");
    }
}

fn invalid(message: String) -> IdmfError {
    IdmfError::InvalidConfig { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.device, "idmf0");
        assert_eq!(config.adc.timing(), AdcTiming::default());
        assert!(config.adc.reference().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str() {
        let config = BoardConfig::from_toml_str(
            r#"
            device = "/dev/rtdm/idmf1"

            [adc]
            reference_adc_volts = 3.2768
            reference_ina_volts = 4.01
            convert_us = 10

            [port]
            x_output = true

            [gpio]
            outputs = 0x0000FF

            [[encoders]]
            channel = 3
            mode = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.device, "/dev/rtdm/idmf1");
        assert_eq!(config.adc.settle_us, 1);
        assert_eq!(config.adc.convert_us, 10);
        assert_eq!(
            config.port,
            Some(PortConfig {
                x_output: true,
                y_output: false,
                z_output: false
            })
        );
        assert_eq!(config.gpio.outputs, Some(0xFF));
        assert_eq!(config.encoders, vec![EncoderConfig { channel: 3, mode: 2 }]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml() {
        let err = BoardConfig::from_toml_str("device = 5").unwrap_err();
        assert!(matches!(err, IdmfError::InvalidConfig { .. }));
    }

    #[test]
    fn test_validation() {
        let mut config = BoardConfig::default();
        config.encoders.push(EncoderConfig { channel: 8, mode: 1 });
        assert!(config.validate().is_err());

        let mut config = BoardConfig::default();
        config.encoders.push(EncoderConfig { channel: 0, mode: 3 });
        assert!(matches!(
            config.validate(),
            Err(IdmfError::InvalidEncoderMode { mode: 3 })
        ));

        let mut config = BoardConfig::default();
        config.gpio.outputs = Some(1 << 24);
        assert!(config.validate().is_err());

        let mut config = BoardConfig::default();
        config.adc.reference_adc_volts = Some(5.5);
        config.adc.reference_ina_volts = Some(1.0);
        assert!(config.validate().is_err());

        let mut config = BoardConfig::default();
        config.adc.reference_adc_volts = Some(2.0);
        assert!(config.validate().is_err());

        let config = BoardConfig::for_device(" ");
        assert!(config.validate().is_err());
    }
}
