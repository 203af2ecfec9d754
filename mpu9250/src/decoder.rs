use nalgebra::Vector3;

/// Splits six bytes read from consecutive `*_H`/`*_L` registers into x, y, z.
#[inline(always)]
pub fn raw_axes(bytes: &[u8; 6]) -> [i16; 3] {
	[
		i16::from_be_bytes([bytes[0], bytes[1]]),
		i16::from_be_bytes([bytes[2], bytes[3]]),
		i16::from_be_bytes([bytes[4], bytes[5]]),
	]
}

/// Converts a raw sample to physical units, `divider` being the LSB count per unit.
pub fn decode_axes(bytes: &[u8; 6], divider: f32) -> Vector3<f32> {
	let [x, y, z] = raw_axes(bytes);

	Vector3::new(x as f32 / divider, y as f32 / divider, z as f32 / divider)
}

/// Inverse of [`raw_axes`], high byte first.
pub fn encode_axes(values: [i16; 3]) -> [u8; 6] {
	let [x_h, x_l] = values[0].to_be_bytes();
	let [y_h, y_l] = values[1].to_be_bytes();
	let [z_h, z_l] = values[2].to_be_bytes();

	[x_h, x_l, y_h, y_l, z_h, z_l]
}
