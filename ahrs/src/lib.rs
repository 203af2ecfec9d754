pub use crate::euler::euler_angles;
pub use crate::inv_sqrt::inv_sqrt;
pub use crate::mahony::{Mahony, DEFAULT_KI, DEFAULT_KP};
use nalgebra::{RealField, Vector3, UnitQuaternion};

mod euler;
mod inv_sqrt;
mod mahony;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AhrsError {
	/// A sample contained NaN or an infinite value, or values large enough to overflow the
	/// update. The filter state was left untouched.
	NonFiniteSample,
}

pub trait Ahrs<N: RealField> where Self: Send + Sync + 'static {
	/// Feeds one IMU sample into the filter.
	///
	/// `gyroscope` is in degrees per second, `accelerometer` in any consistent unit (only its
	/// direction is used) and `dt_ms` is the time elapsed since the previous sample, in
	/// milliseconds.
	fn update_imu(&mut self,
				  gyroscope: &Vector3<N>,
				  accelerometer: &Vector3<N>,
				  dt_ms: N) -> Result<(), AhrsError>;
	fn orientation(&self) -> UnitQuaternion<N>;
}
