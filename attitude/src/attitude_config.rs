use log::LevelFilter;
use mpu9250::{AccelScale, GyroScale};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &'static str = "attitude.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AttitudeConfig {
	pub log_level_filter: String,
	pub log_directory: String,
	pub spi_path: String,
	pub accel_range_g: u8,
	pub gyro_range_dps: u16,
	pub mahony_kp: f32,
	pub mahony_ki: f32,
	pub sample_period_ms: u64,
	/// Euler angles are logged every `report_interval` filter updates
	pub report_interval: u32,
	pub accel_calibration_samples: u32,
}

pub trait TryIntoLevelFilter {
	fn try_into_level_filter(&self) -> Result<LevelFilter, ()>;
}

impl TryIntoLevelFilter for String {
	fn try_into_level_filter(&self) -> Result<LevelFilter, ()> {
		Ok(match self.as_str() {
			"none" => LevelFilter::Off,
			"error" => LevelFilter::Error,
			"warn" => LevelFilter::Warn,
			"info" => LevelFilter::Info,
			"debug" => LevelFilter::Debug,
			"all" => LevelFilter::Trace,
			_ => return Err(()),
		})
	}
}

impl AttitudeConfig {
	pub fn accel_scale(&self) -> anyhow::Result<AccelScale> {
		AccelScale::from_range_g(self.accel_range_g)
			.ok_or_else(|| anyhow!("Invalid accelerometer range ±{} g (expected 2, 4, 8 or 16)", self.accel_range_g))
	}

	pub fn gyro_scale(&self) -> anyhow::Result<GyroScale> {
		GyroScale::from_range_dps(self.gyro_range_dps)
			.ok_or_else(|| anyhow!("Invalid gyroscope range ±{} °/s (expected 250, 500, 1000 or 2000)", self.gyro_range_dps))
	}
}

impl Default for AttitudeConfig {
	fn default() -> Self {
		AttitudeConfig {
			log_level_filter: String::from("info"),
			log_directory: String::from("."),
			spi_path: String::from("/dev/spidev0.1"),
			accel_range_g: AccelScale::default().range_g(),
			gyro_range_dps: GyroScale::default().range_dps(),
			mahony_kp: ahrs::DEFAULT_KP,
			mahony_ki: ahrs::DEFAULT_KI,
			sample_period_ms: 5,
			report_interval: 100,
			accel_calibration_samples: mpu9250::CALIBRATION_SAMPLES,
		}
	}
}

/// Reads the configuration, falling back to the defaults when the file does not exist.
pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<AttitudeConfig> {
	let config_file = match File::open(path.as_ref()) {
		Ok(file) => file,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(AttitudeConfig::default()),
		Err(e) => return Err(e.into()),
	};

	let config: AttitudeConfig = serde_json::from_reader(config_file)
		.map_err(|e| anyhow!("Failed to parse {}: {}", path.as_ref().display(), e))?;

	Ok(config)
}

pub fn save<P: AsRef<Path>>(path: P, config: &AttitudeConfig) -> anyhow::Result<()> {
	let mut config_file = OpenOptions::new()
		.create(true)
		.write(true)
		.truncate(true)
		.open(path)?;

	write!(config_file, "{}", serde_json::to_string_pretty(config)?)?;

	Ok(())
}
