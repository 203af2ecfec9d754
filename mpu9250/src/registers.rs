//! MPU-9250 register map, accelerometer/gyroscope part.

pub const SELF_TEST_X_GYRO: u8 = 0x00;
pub const SELF_TEST_Y_GYRO: u8 = 0x01;
pub const SELF_TEST_Z_GYRO: u8 = 0x02;
pub const SELF_TEST_X_ACCEL: u8 = 0x0D;
pub const SELF_TEST_Y_ACCEL: u8 = 0x0E;
pub const SELF_TEST_Z_ACCEL: u8 = 0x0F;
pub const XG_OFFSET_H: u8 = 0x13;
pub const XG_OFFSET_L: u8 = 0x14;
pub const YG_OFFSET_H: u8 = 0x15;
pub const YG_OFFSET_L: u8 = 0x16;
pub const ZG_OFFSET_H: u8 = 0x17;
pub const ZG_OFFSET_L: u8 = 0x18;
pub const SMPLRT_DIV: u8 = 0x19;
pub const CONFIG: u8 = 0x1A;
pub const GYRO_CONFIG: u8 = 0x1B;
pub const ACCEL_CONFIG: u8 = 0x1C;
pub const ACCEL_CONFIG_2: u8 = 0x1D;
pub const INT_PIN_CFG: u8 = 0x37;
pub const INT_ENABLE: u8 = 0x38;
pub const INT_STATUS: u8 = 0x3A;
pub const ACCEL_XOUT_H: u8 = 0x3B;
pub const TEMP_OUT_H: u8 = 0x41;
pub const GYRO_XOUT_H: u8 = 0x43;
pub const USER_CTRL: u8 = 0x6A;
pub const PWR_MGMT_1: u8 = 0x6B;
pub const PWR_MGMT_2: u8 = 0x6C;
pub const WHO_AM_I: u8 = 0x75;
pub const XA_OFFSET_H: u8 = 0x77;
pub const XA_OFFSET_L: u8 = 0x78;
pub const YA_OFFSET_H: u8 = 0x7A;
pub const YA_OFFSET_L: u8 = 0x7B;
pub const ZA_OFFSET_H: u8 = 0x7D;
pub const ZA_OFFSET_L: u8 = 0x7E;

/// High byte address of each gyroscope offset pair, x, y, z.
pub const GYRO_OFFSET_H: [u8; 3] = [XG_OFFSET_H, YG_OFFSET_H, ZG_OFFSET_H];
/// High byte address of each accelerometer offset pair, x, y, z.
pub const ACCEL_OFFSET_H: [u8; 3] = [XA_OFFSET_H, YA_OFFSET_H, ZA_OFFSET_H];

/// Set on the address byte of an SPI read.
pub const READ_FLAG: u8 = 0x80;
/// `FS_SEL` / `ACCEL_FS_SEL` bits of `GYRO_CONFIG` and `ACCEL_CONFIG`.
pub const FS_SEL_MASK: u8 = 0x18;

pub const WHO_AM_I_MPU9250: u8 = 0x71;
pub const WHO_AM_I_MPU9255: u8 = 0x73;
