use nalgebra::{Quaternion, Vector3, UnitQuaternion};
use crate::{euler, inv_sqrt::inv_sqrt, AhrsError, Ahrs};

/// Default proportional gain.
pub const DEFAULT_KP: f32 = 0.5;
/// Default integral gain, integral feedback disabled.
pub const DEFAULT_KI: f32 = 0.0;

const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
const MS_PER_S: f32 = 1000.0;

/// Mahony complementary filter fusing a gyroscope with the gravity vector measured by an
/// accelerometer.
#[derive(Debug, Clone)]
pub struct Mahony {
	/// Proportional filter gain constant.
	kp: f32,
	/// Integral filter gain constant.
	ki: f32,
	/// Integral feedback, already scaled by `ki`.
	e_int: Vector3<f32>,
	/// Filter state quaternion.
	quat: Quaternion<f32>,
}

impl Mahony {
	pub fn new(kp: f32, ki: f32) -> Self {
		Mahony::with_quaternion(kp, ki, Quaternion::identity())
	}

	pub fn with_quaternion(kp: f32, ki: f32, quat: Quaternion<f32>) -> Self {
		Mahony {
			kp,
			ki,
			e_int: nalgebra::zero(),
			quat,
		}
	}

	pub fn kp(&self) -> f32 {
		self.kp
	}

	pub fn ki(&self) -> f32 {
		self.ki
	}

	/// Changes the gains. Setting `ki` to zero clears the integrator on the next corrected
	/// update.
	pub fn set_gains(&mut self, kp: f32, ki: f32) {
		self.kp = kp;
		self.ki = ki;
	}

	pub fn integral_feedback(&self) -> Vector3<f32> {
		self.e_int
	}

	pub fn quaternion(&self) -> Quaternion<f32> {
		self.quat
	}

	/// Roll, pitch and yaw of the current estimate, in radians.
	pub fn euler_angles(&self) -> (f32, f32, f32) {
		euler::euler_angles(&self.quat)
	}

	/// Back to identity attitude with an empty integrator. Gains are kept.
	pub fn reset(&mut self) {
		self.quat = Quaternion::identity();
		self.e_int = nalgebra::zero();
	}

	/// Advances the estimate by one sample.
	///
	/// Accelerations may be in any unit, angular rates are in degrees per second and `dt_ms`
	/// is the sampling interval in milliseconds. An all-zero acceleration disables the
	/// correction for this step and the gyroscope is integrated alone.
	pub fn update(
		&mut self,
		ax: f32,
		ay: f32,
		az: f32,
		gx: f32,
		gy: f32,
		gz: f32,
		dt_ms: f32,
	) -> Result<(), AhrsError> {
		if ![ax, ay, az, gx, gy, gz, dt_ms].iter().all(|v| v.is_finite()) {
			return Err(AhrsError::NonFiniteSample);
		}

		let q = self.quat;
		let dt = dt_ms / MS_PER_S;
		let mut gyro = Vector3::new(gx, gy, gz) * DEG_TO_RAD;
		let mut e_int = self.e_int;

		// Zero acceleration cannot be normalized
		if !(ax == 0.0 && ay == 0.0 && az == 0.0) {
			let accel_norm_squared = ax * ax + ay * ay + az * az;
			if !accel_norm_squared.is_normal() {
				return Err(AhrsError::NonFiniteSample);
			}
			let accel = Vector3::new(ax, ay, az) * inv_sqrt(accel_norm_squared);

			// Gravity direction predicted by the current attitude
			#[rustfmt::skip]
			let v = Vector3::new(
				2.0 * (q.i * q.k - q.w * q.j),
				2.0 * (q.w * q.i + q.j * q.k),
				q.w * q.w - q.i * q.i - q.j * q.j + q.k * q.k,
			);

			let e = accel.cross(&v);

			if self.ki > 0.0 {
				e_int += e * (self.ki * dt);
				gyro += e_int;
			} else {
				e_int = nalgebra::zero();
			}

			gyro += e * self.kp;
		}

		// First order integration of q_dot = q * (0, gyro) / 2
		let q = q + q * Quaternion::from_parts(0.0, gyro) * (0.5 * dt);

		let norm_squared = q.norm_squared();
		if !norm_squared.is_normal() {
			return Err(AhrsError::NonFiniteSample);
		}

		self.quat = q * inv_sqrt(norm_squared);
		self.e_int = e_int;

		Ok(())
	}
}

impl Default for Mahony {
	fn default() -> Self {
		Mahony::new(DEFAULT_KP, DEFAULT_KI)
	}
}

impl Ahrs<f32> for Mahony {
	fn update_imu(
		&mut self,
		gyroscope: &Vector3<f32>,
		accelerometer: &Vector3<f32>,
		dt_ms: f32,
	) -> Result<(), AhrsError> {
		self.update(
			accelerometer.x, accelerometer.y, accelerometer.z,
			gyroscope.x, gyroscope.y, gyroscope.z,
			dt_ms,
		)
	}

	fn orientation(&self) -> UnitQuaternion<f32> {
		UnitQuaternion::from_quaternion(self.quat)
	}
}
