//! IAU rotation-model evaluation
//!
//! Planetary orientation in the IAU/IAG convention: the pole right
//! ascension and declination drift linearly in Julian centuries, the
//! prime meridian advances in days (with an optional secular
//! acceleration), and a flat table of periodic terms adds the trig
//! series. Each term is one row of amplitudes and arguments, evaluated
//! by a plain function — sin for the right ascension and meridian, cos
//! for the declination:
//!
//! RA  = RA₀  + RA₁·T + Σ aᵢ·sin(φᵢ + fᵢ·t + gᵢ·t²)
//! Dec = Dec₀ + Dec₁·T + Σ bᵢ·cos(φᵢ + fᵢ·t + gᵢ·t²)
//! W   = W₀   + Ẇ·d + Ẅ·T² + Σ cᵢ·sin(φᵢ + fᵢ·t + gᵢ·t²)
//!
//! where T is centuries and d days past the model epoch, and t is days
//! or centuries per the `secular_terms` switch.

use nalgebra::{Matrix3, Vector3};

use crate::angle::Angle;
use crate::constants::{DEG2RAD, J2000};

/// One periodic term: three amplitudes sharing one argument (degrees)
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeriodicTerm {
    pub pole_ra_amp: f64,
    pub pole_dec_amp: f64,
    pub prime_meridian_amp: f64,
    pub phase: f64,
    pub frequency: f64,
    pub frequency_rate: f64,
}

/// IAU-convention rotation model of one body
///
/// All fields in degrees; rates per Julian century for the pole, per day
/// for the meridian.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IauRotationModel {
    /// Model epoch (Julian date), normally J2000.0
    pub epoch: f64,
    pub pole_ra: f64,
    pub pole_ra_rate: f64,
    pub pole_dec: f64,
    pub pole_dec_rate: f64,
    pub prime_meridian: f64,
    /// Meridian rate (degrees/day)
    pub rotation_rate: f64,
    /// Meridian acceleration (degrees/century²)
    pub rotation_accel: f64,
    /// Periodic-term arguments use centuries instead of days
    pub secular_terms: bool,
    pub periodic_terms: Vec<PeriodicTerm>,
}

impl IauRotationModel {
    /// IAU 2009 model for Earth (no periodic terms)
    pub fn earth() -> Self {
        IauRotationModel {
            epoch: J2000,
            pole_ra: 0.0,
            pole_ra_rate: -0.641,
            pole_dec: 90.0,
            pole_dec_rate: -0.557,
            prime_meridian: 190.147,
            rotation_rate: 360.985_623_5,
            rotation_accel: 0.0,
            secular_terms: false,
            periodic_terms: Vec::new(),
        }
    }

    /// IAU 2000 model for Mars (no periodic terms)
    pub fn mars() -> Self {
        IauRotationModel {
            epoch: J2000,
            pole_ra: 317.681_43,
            pole_ra_rate: -0.1061,
            pole_dec: 52.886_50,
            pole_dec_rate: -0.0609,
            prime_meridian: 176.630,
            rotation_rate: 350.891_982_26,
            rotation_accel: 0.0,
            secular_terms: false,
            periodic_terms: Vec::new(),
        }
    }

    /// Accumulated periodic contributions (ra, dec, w) in degrees.
    fn periodic_sums(&self, days: f64, centuries: f64) -> (f64, f64, f64) {
        let t = if self.secular_terms { centuries } else { days };
        let mut ra = 0.0;
        let mut dec = 0.0;
        let mut w = 0.0;
        for term in &self.periodic_terms {
            let arg = (term.phase + term.frequency * t + term.frequency_rate * t * t) * DEG2RAD;
            ra += term.pole_ra_amp * arg.sin();
            dec += term.pole_dec_amp * arg.cos();
            w += term.prime_meridian_amp * arg.sin();
        }
        (ra, dec, w)
    }

    /// Pole right ascension and declination at a Julian date.
    pub fn pole_orientation(&self, jd: f64) -> (Angle, Angle) {
        let days = jd - self.epoch;
        let centuries = days / 36_525.0;
        let (dra, ddec, _) = self.periodic_sums(days, centuries);
        (
            Angle::from_degrees(self.pole_ra + self.pole_ra_rate * centuries + dra),
            Angle::from_degrees(self.pole_dec + self.pole_dec_rate * centuries + ddec),
        )
    }

    /// Prime-meridian angle W at a Julian date.
    pub fn prime_meridian_angle(&self, jd: f64) -> Angle {
        let days = jd - self.epoch;
        let centuries = days / 36_525.0;
        let (_, _, dw) = self.periodic_sums(days, centuries);
        Angle::from_degrees(
            self.prime_meridian
                + self.rotation_rate * days
                + self.rotation_accel * centuries * centuries
                + dw,
        )
        .normalized()
    }

    /// Body-fixed to reference-frame rotation matrix at a Julian date:
    /// Rz(α + 90°)·Rx(90° − δ)·Rz(W).
    pub fn rotation_matrix(&self, jd: f64) -> Matrix3<f64> {
        let (ra, dec) = self.pole_orientation(jd);
        let w = self.prime_meridian_angle(jd);
        let rz_ra = Matrix3::from(nalgebra::Rotation3::from_axis_angle(
            &Vector3::z_axis(),
            (ra.degrees() + 90.0) * DEG2RAD,
        ));
        let rx_dec = Matrix3::from(nalgebra::Rotation3::from_axis_angle(
            &Vector3::x_axis(),
            (90.0 - dec.degrees()) * DEG2RAD,
        ));
        let rz_w = Matrix3::from(nalgebra::Rotation3::from_axis_angle(
            &Vector3::z_axis(),
            w.radians(),
        ));
        rz_ra * rx_dec * rz_w
    }
}
