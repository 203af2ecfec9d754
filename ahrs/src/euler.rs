use nalgebra::Quaternion;

/// Roll, pitch and yaw (radians) of an attitude quaternion, aerospace Z-Y-X sequence.
///
/// The `asin` argument of the pitch is clamped to `[-1, 1]`: a quaternion that drifted
/// slightly away from unit norm would otherwise yield NaN near ±90° of pitch.
pub fn euler_angles(q: &Quaternion<f32>) -> (f32, f32, f32) {
	let (w, x, y, z) = (q.w, q.i, q.j, q.k);

	let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
	let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
	let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

	(roll, pitch, yaw)
}
