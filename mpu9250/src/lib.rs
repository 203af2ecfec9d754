//! MPU-9250 accelerometer/gyroscope driver with on-chip bias calibration.
//!
//! The bus is abstracted behind [`SensorPort`]; [`SpidevPort`] talks to the chip through
//! Linux `spidev`.

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

#[macro_use]
extern crate log;

mod calibration;
mod decoder;
mod mpu9250;
mod port;
pub mod registers;
mod scale;

use std::fmt;

pub use crate::calibration::{
	compensate_gravity, corrected_accel_bias, gyro_bias, mean_accel_offset, AccelBiasAccumulator,
	CALIBRATION_SAMPLES, GRAVITY_AXIS_THRESHOLD_LSB, GYRO_BIAS_UNIT_SCALE, ONE_G_AT_16G_LSB,
	SAMPLE_DELAY_MS,
};
pub use crate::decoder::{decode_axes, encode_axes, raw_axes};
pub use crate::mpu9250::{AccelCalibrationStep, Mpu9250};
pub use crate::port::{SensorPort, SpidevPort};
pub use crate::scale::{AccelScale, FullScale, GyroScale};

#[derive(Debug)]
pub enum Error<E> {
	/// Communication with the device failed
	Bus(E),
	/// Unexpected `WHO_AM_I` value (contains the value read)
	InvalidDevice(u8),
	/// The full-scale range read back differs from the one just written
	ScaleMismatch { expected: FullScale, found: FullScale },
	/// A computed bias does not fit the 16 bit offset registers (or an accumulator overflowed)
	CalibrationOverflow,
}

impl<E> From<E> for Error<E> {
	fn from(error: E) -> Self {
		Error::Bus(error)
	}
}

impl<E: fmt::Display> fmt::Display for Error<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::Bus(e) => write!(f, "bus error: {}", e),
			Error::InvalidDevice(id) => write!(f, "unexpected WHO_AM_I value {:#04x}", id),
			Error::ScaleMismatch { expected, found } => {
				write!(f, "full-scale range read back as {:?}, expected {:?}", found, expected)
			}
			Error::CalibrationOverflow => write!(f, "calibrated bias out of register range"),
		}
	}
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for Error<E> {}
