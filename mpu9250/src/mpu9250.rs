use nalgebra::Vector3;
use std::time::Instant;

use crate::calibration::{self, AccelBiasAccumulator, CALIBRATION_SAMPLES, SAMPLE_DELAY_MS};
use crate::decoder::{decode_axes, encode_axes, raw_axes};
use crate::port::SensorPort;
use crate::registers::*;
use crate::scale::{AccelScale, FullScale, GyroScale};
use crate::Error;

/// Outcome of one [`Mpu9250::calibrate_accel_step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelCalibrationStep {
	/// Still collecting, `samples` taken so far.
	Collecting { samples: u32 },
	/// Final call: the gravity compensated offset that was written to the device.
	Committed { offset: [i32; 3] },
}

/// One MPU-9250 session: bus port, configured ranges and the factory accelerometer bias
/// captured when the session started.
pub struct Mpu9250<P: SensorPort> {
	port: P,
	accel_scale: AccelScale,
	gyro_scale: GyroScale,
	accel_divider: f32,
	gyro_divider: f32,
	factory_accel_bias: [u8; 6],
	accel_accumulator: AccelBiasAccumulator,
}

impl<P: SensorPort> Mpu9250<P> {
	/// Starts a session: checks `WHO_AM_I`, configures both ranges and saves the factory
	/// accelerometer offset registers.
	pub fn new(port: P, accel_scale: AccelScale, gyro_scale: GyroScale) -> Result<Self, Error<P::Error>> {
		let mut mpu = Self {
			port,
			accel_scale,
			gyro_scale,
			accel_divider: accel_scale.divider(),
			gyro_divider: gyro_scale.divider(),
			factory_accel_bias: [0; 6],
			accel_accumulator: AccelBiasAccumulator::new(),
		};

		let id = mpu.identify()?;
		mpu.set_accel_scale(accel_scale)?;
		mpu.set_gyro_scale(gyro_scale)?;
		mpu.factory_accel_bias = mpu.read_pairs(&ACCEL_OFFSET_H)?;

		info!("MPU-9250 ({:#04x}) ready, accel ±{} g, gyro ±{} °/s, factory accel bias {:?}",
			  id, accel_scale.range_g(), gyro_scale.range_dps(), raw_axes(&mpu.factory_accel_bias));

		Ok(mpu)
	}

	pub fn identify(&mut self) -> Result<u8, Error<P::Error>> {
		let id = self.read_register(WHO_AM_I)?;

		if id != WHO_AM_I_MPU9250 && id != WHO_AM_I_MPU9255 {
			return Err(Error::InvalidDevice(id));
		}

		Ok(id)
	}

	/// Configures the accelerometer range and checks it by reading `ACCEL_CONFIG` back.
	/// Returns the range the device reports. On mismatch the previous divider stays in use.
	pub fn set_accel_scale(&mut self, scale: AccelScale) -> Result<AccelScale, Error<P::Error>> {
		let divider = self.port.configure_full_scale(FullScale::Accel(scale))?;
		let found = AccelScale::from_config_bits(self.read_register(ACCEL_CONFIG)?);

		if found != scale {
			warn!("Accelerometer range read back as {:?} instead of {:?}", found, scale);
			return Err(Error::ScaleMismatch {
				expected: FullScale::Accel(scale),
				found: FullScale::Accel(found),
			});
		}

		self.accel_scale = found;
		self.accel_divider = divider;
		Ok(found)
	}

	/// Configures the gyroscope range and checks it by reading `GYRO_CONFIG` back.
	/// Returns the range the device reports. On mismatch the previous divider stays in use.
	pub fn set_gyro_scale(&mut self, scale: GyroScale) -> Result<GyroScale, Error<P::Error>> {
		let divider = self.port.configure_full_scale(FullScale::Gyro(scale))?;
		let found = GyroScale::from_config_bits(self.read_register(GYRO_CONFIG)?);

		if found != scale {
			warn!("Gyroscope range read back as {:?} instead of {:?}", found, scale);
			return Err(Error::ScaleMismatch {
				expected: FullScale::Gyro(scale),
				found: FullScale::Gyro(found),
			});
		}

		self.gyro_scale = found;
		self.gyro_divider = divider;
		Ok(found)
	}

	pub fn accel_scale(&self) -> AccelScale {
		self.accel_scale
	}

	pub fn gyro_scale(&self) -> GyroScale {
		self.gyro_scale
	}

	pub fn accel_divider(&self) -> f32 {
		self.accel_divider
	}

	pub fn gyro_divider(&self) -> f32 {
		self.gyro_divider
	}

	/// Accelerometer offset registers as they were when the session started.
	pub fn factory_accel_bias(&self) -> [i16; 3] {
		raw_axes(&self.factory_accel_bias)
	}

	pub fn read_raw_accel(&mut self) -> Result<[i16; 3], Error<P::Error>> {
		Ok(raw_axes(&self.read_sample(ACCEL_XOUT_H)?))
	}

	pub fn read_raw_gyro(&mut self) -> Result<[i16; 3], Error<P::Error>> {
		Ok(raw_axes(&self.read_sample(GYRO_XOUT_H)?))
	}

	/// Acceleration in g.
	pub fn read_accel(&mut self) -> Result<Vector3<f32>, Error<P::Error>> {
		let sample = self.read_sample(ACCEL_XOUT_H)?;
		Ok(decode_axes(&sample, self.accel_divider))
	}

	/// Angular rate in degrees per second.
	pub fn read_gyro(&mut self) -> Result<Vector3<f32>, Error<P::Error>> {
		let sample = self.read_sample(GYRO_XOUT_H)?;
		Ok(decode_axes(&sample, self.gyro_divider))
	}

	/// Acceleration (g) and angular rate (°/s) with the instant the read started.
	pub fn read_output(&mut self) -> Result<([Vector3<f32>; 2], Instant), Error<P::Error>> {
		let instant = Instant::now();

		let acc = self.read_accel()?;
		let gyr = self.read_gyro()?;

		Ok(([acc, gyr], instant))
	}

	/// Measures the gyroscope zero-rate offset and writes its opposite to the gyroscope
	/// offset registers. The device must not move during the 200 samples (about 1 s).
	pub fn calibrate_gyro(&mut self) -> Result<[i16; 3], Error<P::Error>> {
		info!("Calibrating gyroscope over {} samples", CALIBRATION_SAMPLES);

		let mut negated_sum = [0i32; 3];

		for _ in 0..CALIBRATION_SAMPLES {
			let raw = self.read_raw_gyro()?;
			for (sum, &r) in negated_sum.iter_mut().zip(raw.iter()) {
				*sum -= r as i32;
			}

			self.port.delay_ms(SAMPLE_DELAY_MS);
		}

		let bias = calibration::gyro_bias(negated_sum, self.gyro_scale).ok_or_else(|| {
			warn!("Gyroscope bias out of range (sum {:?})", negated_sum);
			Error::CalibrationOverflow
		})?;

		self.write_pairs(&GYRO_OFFSET_H, &encode_axes(bias))?;

		debug!("Gyroscope offset registers set to {:?}", bias);
		Ok(bias)
	}

	/// Incremental accelerometer calibration, one sample per call.
	///
	/// `count` is the number of calls still to come: the call with `count == 0` averages
	/// every sample taken since the first call, compensates gravity and commits the result.
	/// The first call of a run restores the factory bias so that the measurement does not
	/// include a previous correction.
	pub fn calibrate_accel_step(&mut self, count: u32) -> Result<AccelCalibrationStep, Error<P::Error>> {
		if self.accel_accumulator.samples() == 0 {
			debug!("Accelerometer calibration started");
			self.revert_accel_bias()?;
		}

		let raw = self.read_raw_accel()?;
		self.accel_accumulator.add(raw).ok_or(Error::CalibrationOverflow)?;

		if count > 0 {
			return Ok(AccelCalibrationStep::Collecting {
				samples: self.accel_accumulator.samples(),
			});
		}

		let samples = self.accel_accumulator.samples();
		let offset = self.accel_accumulator.offset(self.accel_scale);
		self.accel_accumulator.reset();

		info!("Accelerometer offset {:?} from {} samples", offset, samples);
		self.commit_accel_bias(offset)?;

		Ok(AccelCalibrationStep::Committed { offset })
	}

	/// Drops the samples of an unfinished incremental calibration.
	pub fn cancel_accel_calibration(&mut self) {
		self.accel_accumulator.reset();
	}

	/// Blocking measurement of the accelerometer zero-g offset against the factory bias.
	/// Leaves the factory bias in place.
	pub fn measure_accel_offset(&mut self) -> Result<[i32; 3], Error<P::Error>> {
		info!("Measuring accelerometer offset over {} samples", CALIBRATION_SAMPLES);

		self.revert_accel_bias()?;

		let mut accumulator = AccelBiasAccumulator::new();

		for _ in 0..CALIBRATION_SAMPLES {
			let raw = self.read_raw_accel()?;
			accumulator.add(raw).ok_or(Error::CalibrationOverflow)?;

			self.port.delay_ms(SAMPLE_DELAY_MS);
		}

		Ok(accumulator.offset(self.accel_scale))
	}

	/// [`measure_accel_offset`](Self::measure_accel_offset) followed by a commit.
	pub fn calibrate_accel_once(&mut self) -> Result<[i32; 3], Error<P::Error>> {
		let offset = self.measure_accel_offset()?;
		self.commit_accel_bias(offset)?;

		Ok(offset)
	}

	/// Writes the factory bias corrected by `offset` and returns the register values.
	pub fn commit_accel_bias(&mut self, offset: [i32; 3]) -> Result<[i16; 3], Error<P::Error>> {
		let bias = calibration::corrected_accel_bias(&self.factory_accel_bias, offset).ok_or_else(|| {
			warn!("Accelerometer bias out of range (offset {:?})", offset);
			Error::CalibrationOverflow
		})?;

		self.write_pairs(&ACCEL_OFFSET_H, &encode_axes(bias))?;

		debug!("Accelerometer offset registers set to {:?}", bias);
		Ok(bias)
	}

	/// Restores the accelerometer offset registers saved when the session started.
	pub fn revert_accel_bias(&mut self) -> Result<(), Error<P::Error>> {
		let factory = self.factory_accel_bias;
		self.write_pairs(&ACCEL_OFFSET_H, &factory)
	}

	pub fn release(self) -> P {
		self.port
	}

	#[inline(always)]
	fn read_sample(&mut self, address: u8) -> Result<[u8; 6], Error<P::Error>> {
		let mut buffer = [0u8; 6];
		self.port.read_registers(address, &mut buffer)?;
		Ok(buffer)
	}

	fn read_register(&mut self, address: u8) -> Result<u8, Error<P::Error>> {
		let mut buffer = [0u8; 1];
		self.port.read_registers(address, &mut buffer)?;
		Ok(buffer[0])
	}

	/// Reads three 2 byte register pairs, the offset registers are not contiguous.
	fn read_pairs(&mut self, addresses: &[u8; 3]) -> Result<[u8; 6], Error<P::Error>> {
		let mut data = [0u8; 6];
		for (&address, pair) in addresses.iter().zip(data.chunks_mut(2)) {
			self.port.read_registers(address, pair)?;
		}
		Ok(data)
	}

	fn write_pairs(&mut self, addresses: &[u8; 3], data: &[u8; 6]) -> Result<(), Error<P::Error>> {
		for (&address, pair) in addresses.iter().zip(data.chunks(2)) {
			self.port.write_registers(address, pair)?;
		}
		Ok(())
	}
}
