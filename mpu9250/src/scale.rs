use crate::registers::{ACCEL_CONFIG, FS_SEL_MASK, GYRO_CONFIG};

/// Accelerometer full-scale range. Discriminants are the `ACCEL_FS_SEL` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccelScale {
	G2 = 0x00,
	G4 = 0x08,
	G8 = 0x10,
	G16 = 0x18,
}

/// Gyroscope full-scale range. Discriminants are the `GYRO_FS_SEL` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GyroScale {
	Dps250 = 0x00,
	Dps500 = 0x08,
	Dps1000 = 0x10,
	Dps2000 = 0x18,
}

/// A range together with the sensor it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullScale {
	Accel(AccelScale),
	Gyro(GyroScale),
}

/// Rows indexed by `FS_SEL >> 3`: (range in g, LSB per g, divisor to ±16 g offset units).
const ACCEL_TABLE: [(u8, f32, i64); 4] = [
	(2, 16384.0, 8),
	(4, 8192.0, 4),
	(8, 4096.0, 2),
	(16, 2048.0, 1),
];

/// Rows indexed by `FS_SEL >> 3`: (range in °/s, LSB per °/s, divisor to offset units).
/// The offset registers count in ±1000 °/s steps scaled by 100, see `GYRO_BIAS_UNIT_SCALE`.
const GYRO_TABLE: [(u16, f32, i64); 4] = [
	(250, 131.0, 8),
	(500, 65.5, 4),
	(1000, 32.8, 2),
	(2000, 16.4, 1),
];

const ACCEL_SCALES: [AccelScale; 4] = [AccelScale::G2, AccelScale::G4, AccelScale::G8, AccelScale::G16];
const GYRO_SCALES: [GyroScale; 4] = [
	GyroScale::Dps250,
	GyroScale::Dps500,
	GyroScale::Dps1000,
	GyroScale::Dps2000,
];

#[inline(always)]
fn index(config_bits: u8) -> usize {
	((config_bits & FS_SEL_MASK) >> 3) as usize
}

impl AccelScale {
	pub fn config_bits(self) -> u8 {
		self as u8
	}

	/// Decodes the range from a raw `ACCEL_CONFIG` value, other bits are ignored.
	pub fn from_config_bits(config: u8) -> Self {
		ACCEL_SCALES[index(config)]
	}

	pub fn from_range_g(range: u8) -> Option<Self> {
		ACCEL_SCALES.iter().copied().find(|scale| scale.range_g() == range)
	}

	pub fn range_g(self) -> u8 {
		ACCEL_TABLE[index(self as u8)].0
	}

	/// LSB per g.
	pub fn divider(self) -> f32 {
		ACCEL_TABLE[index(self as u8)].1
	}

	pub fn bias_divisor(self) -> i64 {
		ACCEL_TABLE[index(self as u8)].2
	}
}

impl GyroScale {
	pub fn config_bits(self) -> u8 {
		self as u8
	}

	/// Decodes the range from a raw `GYRO_CONFIG` value, other bits are ignored.
	pub fn from_config_bits(config: u8) -> Self {
		GYRO_SCALES[index(config)]
	}

	pub fn from_range_dps(range: u16) -> Option<Self> {
		GYRO_SCALES.iter().copied().find(|scale| scale.range_dps() == range)
	}

	pub fn range_dps(self) -> u16 {
		GYRO_TABLE[index(self as u8)].0
	}

	/// LSB per degree per second.
	pub fn divider(self) -> f32 {
		GYRO_TABLE[index(self as u8)].1
	}

	pub fn bias_divisor(self) -> i64 {
		GYRO_TABLE[index(self as u8)].2
	}
}

impl FullScale {
	/// Configuration register holding the range.
	pub fn register(self) -> u8 {
		match self {
			FullScale::Accel(_) => ACCEL_CONFIG,
			FullScale::Gyro(_) => GYRO_CONFIG,
		}
	}

	pub fn config_bits(self) -> u8 {
		match self {
			FullScale::Accel(scale) => scale.config_bits(),
			FullScale::Gyro(scale) => scale.config_bits(),
		}
	}

	pub fn divider(self) -> f32 {
		match self {
			FullScale::Accel(scale) => scale.divider(),
			FullScale::Gyro(scale) => scale.divider(),
		}
	}
}

impl Default for AccelScale {
	fn default() -> Self {
		AccelScale::G4
	}
}

impl Default for GyroScale {
	fn default() -> Self {
		GyroScale::Dps1000
	}
}
