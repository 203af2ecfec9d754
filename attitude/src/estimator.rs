use crossbeam_channel::{Receiver, TryRecvError};
use std::fmt::{Debug, Display};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ahrs::Ahrs;
use mpu9250::{AccelCalibrationStep, Mpu9250, SensorPort};

/// Samples the MPU-9250 at a fixed period and feeds the attitude filter, optionally running
/// the incremental accelerometer calibration between two filter updates.
pub struct AttitudeEstimator<P: SensorPort, AHRS: Ahrs<f32>> {
	mpu: Mpu9250<P>,
	ahrs: AHRS,
	sample_period: Duration,
	report_interval: u32,
	updates: u32,
	last_instant: Option<Instant>,
	accel_calibration_remaining: Option<u32>,
}

impl<P, AHRS> AttitudeEstimator<P, AHRS>
	where P: SensorPort + Send + 'static,
		  P::Error: Debug + Display + Send + Sync + 'static,
		  AHRS: Ahrs<f32> {
	pub fn new(mpu: Mpu9250<P>, ahrs: AHRS, sample_period: Duration, report_interval: u32) -> Self {
		Self {
			mpu,
			ahrs,
			sample_period,
			report_interval: report_interval.max(1),
			updates: 0,
			last_instant: None,
			accel_calibration_remaining: None,
		}
	}

	/// Collects `samples` accelerometer samples, one per update, then commits the offset.
	pub fn start_accel_calibration(&mut self, samples: u32) {
		info!("Accelerometer calibration over the next {} samples, keep the device level", samples);

		self.mpu.cancel_accel_calibration();
		self.accel_calibration_remaining = Some(samples.saturating_sub(1));
	}

	pub fn is_calibrating(&self) -> bool {
		self.accel_calibration_remaining.is_some()
	}

	/// Roll, pitch and yaw in radians.
	pub fn euler_angles(&self) -> (f32, f32, f32) {
		ahrs::euler_angles(self.ahrs.orientation().quaternion())
	}

	/// One sampling period: calibration step (if any), sensor read and filter update.
	pub fn update(&mut self) -> anyhow::Result<()> {
		if let Some(remaining) = self.accel_calibration_remaining {
			match self.mpu.calibrate_accel_step(remaining) {
				Ok(AccelCalibrationStep::Collecting { .. }) => {
					self.accel_calibration_remaining = Some(remaining - 1);
				}
				Ok(AccelCalibrationStep::Committed { offset }) => {
					info!("Accelerometer calibration done, offset {:?}", offset);
					self.accel_calibration_remaining = None;
				}
				Err(e) => {
					self.mpu.cancel_accel_calibration();
					self.accel_calibration_remaining = None;
					return Err(e.into());
				}
			}
		}

		let ([acc, gyr], instant) = self.mpu.read_output()?;

		let dt_ms = match self.last_instant {
			Some(last_instant) => (instant - last_instant).as_secs_f32() * 1000.0,
			None => self.sample_period.as_secs_f32() * 1000.0,
		};
		self.last_instant = Some(instant);

		if let Err(e) = self.ahrs.update_imu(&gyr, &acc, dt_ms) {
			return Err(anyhow!("{:?} (acc {:?}, gyr {:?})", e, acc, gyr));
		}

		self.updates = self.updates.wrapping_add(1);
		if self.updates % self.report_interval == 0 {
			let (roll, pitch, yaw) = self.euler_angles();
			debug!(target: "ahrs", "{} {} {}", roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees());
		}

		Ok(())
	}

	/// Runs `update` every sample period until something is sent on `stop` (or the sender
	/// is dropped), then hands the estimator back.
	pub fn spawn(mut self, stop: Receiver<()>) -> JoinHandle<Self> {
		thread::spawn(move || {
			loop {
				match stop.try_recv() {
					Err(TryRecvError::Empty) => {}
					_ => break,
				}

				let start = Instant::now();

				if let Err(e) = self.update() {
					error!("{}", e);
				}

				if let Some(remaining) = self.sample_period.checked_sub(start.elapsed()) {
					thread::sleep(remaining);
				}
			}

			self
		})
	}

	pub fn release(self) -> (Mpu9250<P>, AHRS) {
		(self.mpu, self.ahrs)
	}
}
