//! Approximate reciprocal square root used to normalize vectors and quaternions.

/// Returns an approximation of `1 / sqrt(x)` with a relative error below 0.2 %.
///
/// `x` must be strictly positive, the result is garbage otherwise. The estimate is seeded
/// from the IEEE-754 exponent with an integer subtraction and refined with a single
/// Newton-Raphson step, so no division or library square root is involved.
#[cfg(not(all(
	feature = "hardware-rsqrt",
	any(target_arch = "x86", target_arch = "x86_64"),
	target_feature = "sse"
)))]
#[inline]
pub fn inv_sqrt(x: f32) -> f32 {
	const MAGIC: u32 = 0x5f37_59df;

	let y = f32::from_bits(MAGIC.wrapping_sub(x.to_bits() >> 1));
	newton_step(x, y)
}

/// Same contract as the bit-trick version, seeded by the `rsqrtss` instruction.
#[cfg(all(
	feature = "hardware-rsqrt",
	any(target_arch = "x86", target_arch = "x86_64"),
	target_feature = "sse"
))]
#[inline]
pub fn inv_sqrt(x: f32) -> f32 {
	#[cfg(target_arch = "x86")]
	use std::arch::x86::{_mm_cvtss_f32, _mm_rsqrt_ss, _mm_set_ss};
	#[cfg(target_arch = "x86_64")]
	use std::arch::x86_64::{_mm_cvtss_f32, _mm_rsqrt_ss, _mm_set_ss};

	// SAFETY: SSE availability is guaranteed by the `target_feature` gate above.
	let y = unsafe { _mm_cvtss_f32(_mm_rsqrt_ss(_mm_set_ss(x))) };
	newton_step(x, y)
}

#[inline(always)]
fn newton_step(x: f32, y: f32) -> f32 {
	const THREE_HALVES: f32 = 1.5;

	y * (THREE_HALVES - 0.5 * x * y * y)
}
