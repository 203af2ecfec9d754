#[macro_use]
extern crate assert_approx_eq;

use ahrs::{Ahrs, AhrsError, Mahony};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use std::f32::consts::FRAC_PI_2;

const DEFAULT_DT_MS: f32 = 10.0;

// accel (g), gyro (deg/s)
macro_rules! default_sensors(
  () => {
    (
      Vector3::new(0.06640625f32, 0.9794922, -0.01269531),
      Vector3::new(68.75f32, 34.25, 3.0625),
    )
  };
);

fn norm(q: &Quaternion<f32>) -> f32 {
    q.norm_squared().sqrt()
}

#[test]
fn test_norm_stays_unit() {
    let mut ahrs = Mahony::new(2.0, 0.1);
    let (accel, gyro) = default_sensors!();

    for n in 0..20_000 {
        // Vary the inputs so the filter never settles
        let phase = n as f32 * 0.01;
        let gyro = gyro * phase.sin();
        let accel = accel + Vector3::new(phase.cos(), 0.0, 0.3 * phase.sin());

        ahrs.update_imu(&gyro, &accel, DEFAULT_DT_MS).unwrap();

        let q = ahrs.quaternion();
        assert!((norm(&q) - 1.0).abs() < 2e-3, "norm drifted to {} at step {}", norm(&q), n);
    }
}

#[test]
fn test_identity_is_stable() {
    let mut ahrs = Mahony::default();

    for _ in 0..1000 {
        ahrs.update(0.0, 0.0, 1.0, 0.0, 0.0, 0.0, DEFAULT_DT_MS).unwrap();
    }

    let q = ahrs.quaternion();
    assert_approx_eq!(q.w, 1.0, 2e-3);
    assert_approx_eq!(q.i, 0.0, 1e-6);
    assert_approx_eq!(q.j, 0.0, 1e-6);
    assert_approx_eq!(q.k, 0.0, 1e-6);
}

#[test]
fn test_zero_accel_is_pure_gyro_integration() {
    let mut corrected = Mahony::new(5.0, 1.0);
    let mut uncorrected = Mahony::new(0.0, 0.0);
    let (accel, gyro) = default_sensors!();

    for _ in 0..500 {
        corrected.update(0.0, 0.0, 0.0, gyro.x, gyro.y, gyro.z, DEFAULT_DT_MS).unwrap();
        uncorrected.update(accel.x, accel.y, accel.z, gyro.x, gyro.y, gyro.z, DEFAULT_DT_MS).unwrap();
    }

    assert_eq!(corrected.quaternion(), uncorrected.quaternion());
    assert_eq!(corrected.integral_feedback(), Vector3::zeros());
}

#[test]
fn test_zero_accel_yaw_rotation() {
    let mut ahrs = Mahony::default();

    // 90 deg/s about z during one second
    for _ in 0..100 {
        ahrs.update(0.0, 0.0, 0.0, 0.0, 0.0, 90.0, DEFAULT_DT_MS).unwrap();
    }

    // The approximate renormalization leaves the norm up to 0.2 % short, which shows up
    // in the extracted yaw.
    let (roll, pitch, yaw) = ahrs.euler_angles();
    assert_approx_eq!(roll, 0.0, 1e-4);
    assert_approx_eq!(pitch, 0.0, 1e-4);
    assert_approx_eq!(yaw, FRAC_PI_2, 5e-3);
}

#[test]
fn test_converges_to_gravity() {
    let tilted = UnitQuaternion::from_euler_angles(0.3f32, -0.2, 0.0).into_inner();
    let mut ahrs = Mahony::with_quaternion(2.0, 0.0, tilted);

    // Device lying flat
    for _ in 0..2000 {
        ahrs.update(0.0, 0.0, 1.0, 0.0, 0.0, 0.0, DEFAULT_DT_MS).unwrap();
    }

    let (roll, pitch, _) = ahrs.euler_angles();
    assert_approx_eq!(roll, 0.0, 1e-2);
    assert_approx_eq!(pitch, 0.0, 1e-2);
}

#[test]
fn test_integral_cleared_when_disabled() {
    let tilted = UnitQuaternion::from_euler_angles(0.5f32, 0.0, 0.0).into_inner();
    let mut ahrs = Mahony::with_quaternion(0.5, 0.5, tilted);

    for _ in 0..10 {
        ahrs.update(0.0, 0.0, 1.0, 0.0, 0.0, 0.0, DEFAULT_DT_MS).unwrap();
    }
    assert!(ahrs.integral_feedback().norm() > 0.0);

    // Gyro-only steps leave the integrator alone
    let before = ahrs.integral_feedback();
    ahrs.set_gains(0.5, 0.0);
    ahrs.update(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, DEFAULT_DT_MS).unwrap();
    assert_eq!(ahrs.integral_feedback(), before);

    ahrs.update(0.0, 0.0, 1.0, 0.0, 0.0, 0.0, DEFAULT_DT_MS).unwrap();
    assert_eq!(ahrs.integral_feedback(), Vector3::zeros());
}

#[test]
fn test_deterministic() {
    let (accel, gyro) = default_sensors!();
    let mut a = Mahony::new(1.0, 0.2);
    let mut b = Mahony::new(1.0, 0.2);

    for _ in 0..250 {
        a.update_imu(&gyro, &accel, DEFAULT_DT_MS).unwrap();
        b.update_imu(&gyro, &accel, DEFAULT_DT_MS).unwrap();
    }

    assert_eq!(a.quaternion(), b.quaternion());
    assert_eq!(a.integral_feedback(), b.integral_feedback());
}

#[test]
fn test_non_finite_sample_rejected() {
    let mut ahrs = Mahony::default();
    ahrs.update(0.1, 0.0, 1.0, 5.0, 0.0, 0.0, DEFAULT_DT_MS).unwrap();
    let before = ahrs.quaternion();

    let res = ahrs.update(f32::NAN, 0.0, 1.0, 0.0, 0.0, 0.0, DEFAULT_DT_MS);
    assert_eq!(res, Err(AhrsError::NonFiniteSample));

    let res = ahrs.update(0.0, 0.0, 1.0, f32::INFINITY, 0.0, 0.0, DEFAULT_DT_MS);
    assert_eq!(res, Err(AhrsError::NonFiniteSample));

    assert_eq!(ahrs.quaternion(), before);
}

#[test]
fn test_overflowing_sample_rejected() {
    let mut ahrs = Mahony::new(0.5, 0.1);
    ahrs.update(0.1, 0.0, 1.0, 5.0, 0.0, 0.0, DEFAULT_DT_MS).unwrap();
    let before = ahrs.quaternion();
    let integral_before = ahrs.integral_feedback();

    // Finite, but the squared accel norm overflows
    let res = ahrs.update(0.0, 0.0, 1e20, 0.0, 0.0, 0.0, DEFAULT_DT_MS);
    assert_eq!(res, Err(AhrsError::NonFiniteSample));

    // Finite, but the integrated quaternion norm overflows
    let res = ahrs.update(0.0, 0.0, 1.0, 1e30, 0.0, 0.0, DEFAULT_DT_MS);
    assert_eq!(res, Err(AhrsError::NonFiniteSample));

    assert_eq!(ahrs.quaternion(), before);
    assert_eq!(ahrs.integral_feedback(), integral_before);

    ahrs.update(0.0, 0.0, 1.0, 0.0, 0.0, 0.0, DEFAULT_DT_MS).unwrap();
    assert!((norm(&ahrs.quaternion()) - 1.0).abs() < 2e-3);
}

#[test]
fn test_gyro_step_matches_quaternion_derivative() {
    let q = UnitQuaternion::from_euler_angles(0.1f32, 0.2, 0.3).into_inner();
    let mut ahrs = Mahony::with_quaternion(0.5, 0.1, q);

    let (gx, gy, gz) = (10.0f32, -20.0, 30.0);
    ahrs.update(0.0, 0.0, 0.0, gx, gy, gz, DEFAULT_DT_MS).unwrap();

    // q + dt / 2 * q ⊗ (0, ω), written out per component
    let (wx, wy, wz) = (gx.to_radians(), gy.to_radians(), gz.to_radians());
    let h = 0.5 * DEFAULT_DT_MS / 1000.0;
    let expected = Quaternion::new(
        q.w - h * (q.i * wx + q.j * wy + q.k * wz),
        q.i + h * (q.w * wx + q.j * wz - q.k * wy),
        q.j + h * (q.w * wy - q.i * wz + q.k * wx),
        q.k + h * (q.w * wz + q.i * wy - q.j * wx),
    );
    let expected = expected * ahrs::inv_sqrt(expected.norm_squared());

    let actual = ahrs.quaternion();
    assert_approx_eq!(actual.w, expected.w, 1e-6);
    assert_approx_eq!(actual.i, expected.i, 1e-6);
    assert_approx_eq!(actual.j, expected.j, 1e-6);
    assert_approx_eq!(actual.k, expected.k, 1e-6);
}

#[test]
fn test_orientation_is_unit() {
    let (accel, gyro) = default_sensors!();
    let mut ahrs = Mahony::default();
    ahrs.update_imu(&gyro, &accel, DEFAULT_DT_MS).unwrap();

    let orientation = ahrs.orientation();
    assert_approx_eq!(orientation.into_inner().norm(), 1.0, 1e-6);
}
