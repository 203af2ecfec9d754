#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate log;

use crossbeam_channel::unbounded;
use std::time::Duration;

use crate::attitude_config::TryIntoLevelFilter;
use crate::estimator::AttitudeEstimator;

use ahrs::Mahony;
use black_box::BlackBox;
use mpu9250::{Mpu9250, SpidevPort};

mod attitude_config;
mod estimator;

fn main() -> anyhow::Result<()> {
	std::env::set_var("RUST_BACKTRACE", "full");

	// Command line arguments
	const CONFIG_ARG: &'static str = "config";
	const CALIBRATE_GYRO_ARG: &'static str = "calibrate-gyro";
	const CALIBRATE_ACCEL_ARG: &'static str = "calibrate-accel";
	const REVERT_ACCEL_BIAS_ARG: &'static str = "revert-accel-bias";

	let args = clap::App::new("Attitude")
		.version(env!("CARGO_PKG_VERSION"))
		.author("Vincent Leporcher <vincent.leporcher@telecom-paris.fr>")
		.arg(clap::Arg::new(CONFIG_ARG)
			.long("config")
			.value_name("FILE")
			.help("Configuration file, created with default values if missing")
			.takes_value(true)
			.default_value(attitude_config::DEFAULT_CONFIG_PATH))
		.arg(clap::Arg::new(CALIBRATE_GYRO_ARG)
			.long("calibrate-gyro")
			.help("Calibrate the gyroscope offset registers upon start (device still)")
			.takes_value(false))
		.arg(clap::Arg::new(CALIBRATE_ACCEL_ARG)
			.long("calibrate-accel")
			.help("Calibrate the accelerometer offset registers while filtering (device level)")
			.takes_value(false))
		.arg(clap::Arg::new(REVERT_ACCEL_BIAS_ARG)
			.long("revert-accel-bias")
			.help("Restore the factory accelerometer offsets on exit")
			.takes_value(false))
		.get_matches();

	// Configuration
	let config_path = args.value_of(CONFIG_ARG).unwrap_or(attitude_config::DEFAULT_CONFIG_PATH);
	let config = attitude_config::read(config_path)?;

	if !std::path::Path::new(config_path).exists() {
		attitude_config::save(config_path, &config)?;
	}

	// Log
	let level_filter = config.log_level_filter
		.try_into_level_filter()
		.map_err(|_| anyhow!("Failed to parse log level filter \"{}\"", config.log_level_filter))?;

	let black_box = BlackBox::new(&config.log_directory, "attitude")?;
	let black_box_path = black_box.path().to_path_buf();
	black_box.spawn(level_filter)
		.map_err(|e| anyhow!("Failed to install logger: {}", e))?;

	info!("Attitude {}, logging to {}", env!("CARGO_PKG_VERSION"), black_box_path.display());

	// Sensor
	let port = SpidevPort::open(&config.spi_path)?;
	let mut mpu = Mpu9250::new(port, config.accel_scale()?, config.gyro_scale()?)?;

	if args.is_present(CALIBRATE_GYRO_ARG) {
		let bias = mpu.calibrate_gyro()?;
		info!("Gyroscope offset registers: {:?}", bias);
	}

	// Estimator
	let mut estimator = AttitudeEstimator::new(
		mpu,
		Mahony::new(config.mahony_kp, config.mahony_ki),
		Duration::from_millis(config.sample_period_ms),
		config.report_interval,
	);

	if args.is_present(CALIBRATE_ACCEL_ARG) {
		estimator.start_accel_calibration(config.accel_calibration_samples);
	}

	let (stop_sender, stop_receiver) = unbounded::<()>();
	let handle = estimator.spawn(stop_receiver);

	info!("Press enter to stop");
	std::io::stdin().read_line(&mut String::new())?;

	stop_sender.send(())?;
	let estimator = handle.join()
		.map_err(|_| anyhow!("Estimator thread panicked"))?;

	let (roll, pitch, yaw) = estimator.euler_angles();
	info!("Final attitude: roll {:.2}°, pitch {:.2}°, yaw {:.2}°",
		  roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees());

	let (mut mpu, _) = estimator.release();

	if args.is_present(REVERT_ACCEL_BIAS_ARG) {
		mpu.revert_accel_bias()?;
		info!("Factory accelerometer offsets restored: {:?}", mpu.factory_accel_bias());
	}

	log::logger().flush();
	std::thread::sleep(Duration::from_millis(100));

	Ok(())
}
