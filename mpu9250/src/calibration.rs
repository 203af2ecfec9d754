//! Bias arithmetic for the on-chip offset registers.
//!
//! Everything here is pure: sampling and register access live in [`crate::Mpu9250`].

use crate::decoder::raw_axes;
use crate::scale::{AccelScale, GyroScale};
use std::convert::TryFrom;

/// Samples averaged by the blocking calibrations.
pub const CALIBRATION_SAMPLES: u32 = 200;
/// Pause between two calibration samples.
pub const SAMPLE_DELAY_MS: u32 = 5;
/// Gyroscope offset register units per ±1000 °/s raw LSB, times 100.
pub const GYRO_BIAS_UNIT_SCALE: i64 = 100;
/// 1 g expressed in accelerometer offset register LSB (±16 g resolution), whatever the
/// configured range.
pub const ONE_G_AT_16G_LSB: i32 = 2048;
/// A mean offset above this magnitude can only come from the axis carrying gravity.
pub const GRAVITY_AXIS_THRESHOLD_LSB: i32 = 1000;

/// Gyroscope offset register values from a sum of negated raw samples.
///
/// Each axis is `sum / divisor / 100`, truncated toward zero on a 64 bit intermediate.
/// `None` when a value does not fit 16 bits.
pub fn gyro_bias(negated_sum: [i32; 3], scale: GyroScale) -> Option<[i16; 3]> {
	let mut bias = [0i16; 3];

	for (b, &sum) in bias.iter_mut().zip(negated_sum.iter()) {
		let value = sum as i64 / scale.bias_divisor() / GYRO_BIAS_UNIT_SCALE;
		*b = i16::try_from(value).ok()?;
	}

	Some(bias)
}

/// Mean raw accelerometer offset in ±16 g LSB, before gravity compensation.
pub fn mean_accel_offset(sum: [i32; 3], samples: u32, scale: AccelScale) -> [i32; 3] {
	if samples == 0 {
		return [0; 3];
	}

	let divisor = scale.bias_divisor() * samples as i64;
	let mut offset = [0i32; 3];

	for (o, &s) in offset.iter_mut().zip(sum.iter()) {
		// |s / samples| never exceeds 32768
		*o = (s as i64 / divisor) as i32;
	}

	offset
}

/// Removes 1 g from the axis that carries gravity so that only the zero-g offset remains.
pub fn compensate_gravity(mut offset: [i32; 3]) -> [i32; 3] {
	for o in offset.iter_mut() {
		if *o > GRAVITY_AXIS_THRESHOLD_LSB {
			*o -= ONE_G_AT_16G_LSB;
		} else if *o < -GRAVITY_AXIS_THRESHOLD_LSB {
			*o += ONE_G_AT_16G_LSB;
		}
	}

	offset
}

/// New accelerometer offset registers: factory values minus the measured offset.
///
/// Bit 0 of the offset registers is reserved, so the offset is rounded down to an even
/// value and the factory bit 0 survives. `None` when a value does not fit 16 bits.
pub fn corrected_accel_bias(factory: &[u8; 6], offset: [i32; 3]) -> Option<[i16; 3]> {
	let factory = raw_axes(factory);
	let mut bias = [0i16; 3];

	for i in 0..3 {
		let value = factory[i] as i32 - (offset[i] & !1);
		bias[i] = i16::try_from(value).ok()?;
	}

	Some(bias)
}

/// Running sum of raw accelerometer samples for the incremental calibration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AccelBiasAccumulator {
	sum: [i32; 3],
	samples: u32,
}

impl AccelBiasAccumulator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds one sample. `None` if a sum would overflow, the accumulator is then unchanged.
	pub fn add(&mut self, raw: [i16; 3]) -> Option<()> {
		let samples = self.samples.checked_add(1)?;
		let mut sum = self.sum;
		for (s, &r) in sum.iter_mut().zip(raw.iter()) {
			*s = s.checked_add(r as i32)?;
		}

		self.sum = sum;
		self.samples = samples;
		Some(())
	}

	pub fn sum(&self) -> [i32; 3] {
		self.sum
	}

	pub fn samples(&self) -> u32 {
		self.samples
	}

	/// Gravity compensated mean offset of everything collected so far.
	pub fn offset(&self, scale: AccelScale) -> [i32; 3] {
		compensate_gravity(mean_accel_offset(self.sum, self.samples, scale))
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}
}
