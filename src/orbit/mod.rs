//! Orbital element sets, state vectors and the Keplerian tracker
//!
//! The data model is the classical one: [`KeplerianOrbitElems`] keyed on
//! pericentre distance (finite for every conic, unlike the semi-major
//! axis), [`EquinoctialOrbitElems`] for the near-circular/near-equatorial
//! cases where the Keplerian angles go singular, and
//! [`OrbitStateVectors`] in metres and metres per second.
//!
//! [`KeplerianSatelliteTracker`] owns an initial and a current element
//! set; advancing time only moves the mean anomaly (two-body motion), and
//! [`KeplerianSatelliteTracker::state_vectors`] turns the current
//! elements into a position/velocity pair through the perifocal frame and
//! the rotation Rz(Ω)·Rx(i)·Rz(ω), followed by a configurable axis-mapper
//! matrix for callers whose world axes are not Z-up.
//!
//! Catalog objects carry their orbit block in degree-valued fields with
//! unset entries; [`OrbitParams`] mirrors that shape and converts in both
//! directions without losing the unset markers.

use std::f64::consts::PI;

use nalgebra::{Matrix3, Vector3};

use crate::angle::Angle;
use crate::constants::{DAY_S, TAU};
use crate::kepler::{
    inverse_kepler_parabolic, HyperbolicKepler, InverseKepler, NewtonKepler,
};
use crate::{AstrokitError, Result};

/// Conic classification by eccentricity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitType {
    Elliptic,
    Parabolic,
    Hyperbolic,
}

/// Classical Keplerian orbital elements
///
/// Lengths in metres, times in seconds, epoch as a Julian date. Unset
/// scalar fields are NaN; unset angles are [`Angle::NO_DATA`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeplerianOrbitElems {
    pub ref_plane: Option<String>,
    /// Epoch of the element set (Julian date)
    pub epoch: f64,
    /// Gravitational parameter μ = GM of the primary (m³/s²)
    pub grav_param: f64,
    /// Pericentre distance q (m)
    pub pericenter_dist: f64,
    /// Orbital period (s); infinite for open orbits
    pub period: f64,
    pub eccentricity: f64,
    pub inclination: Angle,
    pub ascending_node: Angle,
    pub arg_of_pericenter: Angle,
    pub mean_anomaly: Angle,
}

impl Default for KeplerianOrbitElems {
    fn default() -> Self {
        KeplerianOrbitElems {
            ref_plane: None,
            epoch: f64::NAN,
            grav_param: f64::NAN,
            pericenter_dist: f64::NAN,
            period: f64::NAN,
            eccentricity: f64::NAN,
            inclination: Angle::NO_DATA,
            ascending_node: Angle::NO_DATA,
            arg_of_pericenter: Angle::NO_DATA,
            mean_anomaly: Angle::NO_DATA,
        }
    }
}

impl KeplerianOrbitElems {
    /// Conic type from the eccentricity (e = 1 within 1e-12 is parabolic).
    pub fn orbit_type(&self) -> OrbitType {
        if (self.eccentricity - 1.0).abs() < 1e-12 {
            OrbitType::Parabolic
        } else if self.eccentricity < 1.0 {
            OrbitType::Elliptic
        } else {
            OrbitType::Hyperbolic
        }
    }

    /// Semi-major axis a = q/(1 − e); negative for hyperbolas, infinite
    /// for parabolas.
    pub fn semi_major_axis(&self) -> f64 {
        match self.orbit_type() {
            OrbitType::Parabolic => f64::INFINITY,
            _ => self.pericenter_dist / (1.0 - self.eccentricity),
        }
    }

    /// Semi-latus rectum p (m)
    pub fn semi_latus_rectum(&self) -> f64 {
        match self.orbit_type() {
            OrbitType::Parabolic => 2.0 * self.pericenter_dist,
            _ => self.pericenter_dist * (1.0 + self.eccentricity),
        }
    }

    /// Validate the invariants and fill the derivable fields.
    ///
    /// e must be non-negative and q positive; for closed orbits the
    /// period and the gravitational parameter each determine the other
    /// through Kepler's third law, so either may be left unset. Open
    /// orbits require μ and get an infinite period.
    pub fn completed(mut self) -> Result<Self> {
        if self.eccentricity.is_nan() || self.eccentricity < 0.0 {
            return Err(AstrokitError::NumericDomain(format!(
                "eccentricity must be non-negative, got {}",
                self.eccentricity
            )));
        }
        if self.pericenter_dist.is_nan() || self.pericenter_dist <= 0.0 {
            return Err(AstrokitError::NumericDomain(format!(
                "pericentre distance must be positive, got {}",
                self.pericenter_dist
            )));
        }
        for (name, angle) in [
            ("inclination", self.inclination),
            ("ascending node", self.ascending_node),
            ("argument of pericentre", self.arg_of_pericenter),
            ("mean anomaly", self.mean_anomaly),
        ] {
            if angle.is_no_data() {
                return Err(AstrokitError::NumericDomain(format!("{name} is unset")));
            }
        }
        match self.orbit_type() {
            OrbitType::Elliptic => {
                let a = self.semi_major_axis();
                if self.grav_param.is_nan() && self.period.is_nan() {
                    return Err(AstrokitError::NumericDomain(
                        "either the gravitational parameter or the period is required".into(),
                    ));
                }
                if self.grav_param.is_nan() {
                    // μ from T: μ = (2π/T)² a³
                    let n = TAU / self.period;
                    self.grav_param = n * n * a.powi(3);
                } else if self.period.is_nan() {
                    self.period = TAU * (a.powi(3) / self.grav_param).sqrt();
                }
            }
            OrbitType::Parabolic | OrbitType::Hyperbolic => {
                if self.grav_param.is_nan() {
                    return Err(AstrokitError::NumericDomain(
                        "open orbits require the gravitational parameter".into(),
                    ));
                }
                self.period = f64::INFINITY;
            }
        }
        if self.grav_param <= 0.0 {
            return Err(AstrokitError::NumericDomain(format!(
                "gravitational parameter must be positive, got {}",
                self.grav_param
            )));
        }
        Ok(self)
    }

    /// Mean angular velocity n (rad/s) for the conic type.
    pub fn mean_motion(&self) -> f64 {
        match self.orbit_type() {
            OrbitType::Parabolic => {
                (self.grav_param / self.pericenter_dist.powi(3)).sqrt() / 2.0
            }
            _ => {
                let a = self.semi_major_axis().abs();
                (self.grav_param / a.powi(3)).sqrt()
            }
        }
    }
}

impl std::fmt::Display for KeplerianOrbitElems {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "KeplerianOrbitElems(q={:.3e} m, e={:.6}, i={:.3}°, Ω={:.3}°, ω={:.3}°, M={:.3}°)",
            self.pericenter_dist,
            self.eccentricity,
            self.inclination.degrees(),
            self.ascending_node.degrees(),
            self.arg_of_pericenter.degrees(),
            self.mean_anomaly.degrees(),
        )
    }
}

/// Equinoctial orbital elements
///
/// The non-singular set (f, g) = e·(cos ϖ, sin ϖ) and
/// (h, k) = tan(i/2)·(cos Ω, sin Ω) with the mean longitude
/// L = Ω + ω + M; well behaved where i → 0 or e → 0 break the Keplerian
/// angles apart.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquinoctialOrbitElems {
    pub ref_plane: Option<String>,
    pub epoch: f64,
    pub grav_param: f64,
    pub pericenter_dist: f64,
    pub period: f64,
    /// e·cos(Ω + ω)
    pub eccentricity_f: f64,
    /// e·sin(Ω + ω)
    pub eccentricity_g: f64,
    /// tan(i/2)·cos Ω
    pub inclination_h: f64,
    /// tan(i/2)·sin Ω
    pub inclination_k: f64,
    /// Mean longitude L = Ω + ω + M
    pub mean_longitude: Angle,
}

impl From<&KeplerianOrbitElems> for EquinoctialOrbitElems {
    fn from(kep: &KeplerianOrbitElems) -> Self {
        let pomega = kep.ascending_node.radians() + kep.arg_of_pericenter.radians();
        let half_tan = (kep.inclination.radians() / 2.0).tan();
        EquinoctialOrbitElems {
            ref_plane: kep.ref_plane.clone(),
            epoch: kep.epoch,
            grav_param: kep.grav_param,
            pericenter_dist: kep.pericenter_dist,
            period: kep.period,
            eccentricity_f: kep.eccentricity * pomega.cos(),
            eccentricity_g: kep.eccentricity * pomega.sin(),
            inclination_h: half_tan * kep.ascending_node.cos(),
            inclination_k: half_tan * kep.ascending_node.sin(),
            mean_longitude: Angle::from_radians(pomega + kep.mean_anomaly.radians())
                .to_unit(kep.mean_anomaly.unit()),
        }
    }
}

impl From<&EquinoctialOrbitElems> for KeplerianOrbitElems {
    fn from(eq: &EquinoctialOrbitElems) -> Self {
        let ecc = (eq.eccentricity_f.hypot(eq.eccentricity_g)).abs();
        let pomega = eq.eccentricity_g.atan2(eq.eccentricity_f);
        let node = eq.inclination_k.atan2(eq.inclination_h);
        let incl = 2.0 * eq.inclination_h.hypot(eq.inclination_k).atan();
        KeplerianOrbitElems {
            ref_plane: eq.ref_plane.clone(),
            epoch: eq.epoch,
            grav_param: eq.grav_param,
            pericenter_dist: eq.pericenter_dist,
            period: eq.period,
            eccentricity: ecc,
            inclination: Angle::from_radians(incl),
            ascending_node: Angle::from_radians(node),
            arg_of_pericenter: Angle::from_radians(pomega - node),
            mean_anomaly: Angle::from_radians(eq.mean_longitude.radians() - pomega),
        }
    }
}

/// Instantaneous position and velocity of an orbiting body
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrbitStateVectors {
    pub ref_plane: Option<String>,
    /// Gravitational parameter μ of the primary (m³/s²)
    pub grav_param: f64,
    /// Epoch of the state (Julian date)
    pub time: f64,
    /// Position (m)
    pub position: Vector3<f64>,
    /// Velocity (m/s)
    pub velocity: Vector3<f64>,
}

/// Orbit block of a SpaceEngine-style catalog object
///
/// Angles in degrees, period in seconds, distances in metres; unset
/// fields are NaN (scalars) or None (strings), and conversions to and
/// from [`KeplerianOrbitElems`] keep them unset.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrbitParams {
    pub ref_plane: Option<String>,
    pub epoch: Option<f64>,
    pub period: Option<f64>,
    pub pericenter_dist: Option<f64>,
    pub grav_param: Option<f64>,
    pub eccentricity: Option<f64>,
    pub inclination_deg: Option<f64>,
    pub ascending_node_deg: Option<f64>,
    pub arg_of_pericenter_deg: Option<f64>,
    pub mean_anomaly_deg: Option<f64>,
}

fn opt_to_nan(v: Option<f64>) -> f64 {
    v.unwrap_or(f64::NAN)
}

fn nan_to_opt(v: f64) -> Option<f64> {
    if v.is_nan() {
        None
    } else {
        Some(v)
    }
}

fn opt_to_angle_deg(v: Option<f64>) -> Angle {
    match v {
        Some(d) => Angle::from_degrees(d),
        None => Angle::NO_DATA,
    }
}

fn angle_to_opt_deg(a: Angle) -> Option<f64> {
    if a.is_no_data() {
        None
    } else {
        Some(a.degrees())
    }
}

impl From<&OrbitParams> for KeplerianOrbitElems {
    fn from(p: &OrbitParams) -> Self {
        KeplerianOrbitElems {
            ref_plane: p.ref_plane.clone(),
            epoch: opt_to_nan(p.epoch),
            grav_param: opt_to_nan(p.grav_param),
            pericenter_dist: opt_to_nan(p.pericenter_dist),
            period: opt_to_nan(p.period),
            eccentricity: opt_to_nan(p.eccentricity),
            inclination: opt_to_angle_deg(p.inclination_deg),
            ascending_node: opt_to_angle_deg(p.ascending_node_deg),
            arg_of_pericenter: opt_to_angle_deg(p.arg_of_pericenter_deg),
            mean_anomaly: opt_to_angle_deg(p.mean_anomaly_deg),
        }
    }
}

impl From<&KeplerianOrbitElems> for OrbitParams {
    fn from(k: &KeplerianOrbitElems) -> Self {
        OrbitParams {
            ref_plane: k.ref_plane.clone(),
            epoch: nan_to_opt(k.epoch),
            period: nan_to_opt(k.period),
            pericenter_dist: nan_to_opt(k.pericenter_dist),
            grav_param: nan_to_opt(k.grav_param),
            eccentricity: nan_to_opt(k.eccentricity),
            inclination_deg: angle_to_opt_deg(k.inclination),
            ascending_node_deg: angle_to_opt_deg(k.ascending_node),
            arg_of_pericenter_deg: angle_to_opt_deg(k.arg_of_pericenter),
            mean_anomaly_deg: angle_to_opt_deg(k.mean_anomaly),
        }
    }
}

/// Default axis mapper: Z-up inertial axes into the renderer convention
/// (x forward, y up, z right).
pub fn default_axis_mapper() -> Matrix3<f64> {
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, 0.0, -1.0, //
        0.0, 1.0, 0.0,
    )
}

/// Inverse of [`default_axis_mapper`], applied before extracting elements
/// from state vectors.
pub fn default_axis_unmapper() -> Matrix3<f64> {
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, //
        0.0, -1.0, 0.0,
    )
}

/// Two-body satellite tracker over Keplerian elements
///
/// Holds the element set it was created with and a current set whose mean
/// anomaly advances with time; every other element is constant under
/// two-body dynamics.
#[derive(Debug, Clone)]
pub struct KeplerianSatelliteTracker {
    initial: KeplerianOrbitElems,
    current: KeplerianOrbitElems,
    /// Mean angular velocity (rad/s)
    mean_motion: f64,
}

impl KeplerianSatelliteTracker {
    /// Create from an element set; missing derivable fields are filled.
    pub fn new(elems: KeplerianOrbitElems) -> Result<Self> {
        let elems = elems.completed()?;
        let mean_motion = elems.mean_motion();
        Ok(KeplerianSatelliteTracker {
            initial: elems.clone(),
            current: elems,
            mean_motion,
        })
    }

    /// Create from a state-vector snapshot (default axis convention).
    pub fn from_state_vectors(state: &OrbitStateVectors) -> Result<Self> {
        let elems = state_vectors_to_elements(state, None)?;
        Self::new(elems)
    }

    pub fn elements(&self) -> &KeplerianOrbitElems {
        &self.current
    }

    pub fn equinoctial_elements(&self) -> EquinoctialOrbitElems {
        EquinoctialOrbitElems::from(&self.current)
    }

    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    /// Advance by a time span in seconds.
    pub fn add_seconds(&mut self, seconds: i64) {
        self.advance(seconds as f64);
    }

    pub fn add_msecs(&mut self, msecs: i64) {
        self.advance(msecs as f64 / 1000.0);
    }

    pub fn add_hours(&mut self, hours: i64) {
        self.advance(hours as f64 * 3600.0);
    }

    pub fn add_days(&mut self, days: i64) {
        self.advance(days as f64 * DAY_S);
    }

    pub fn add_years(&mut self, years: i64) {
        self.advance(years as f64 * 365.25 * DAY_S);
    }

    pub fn add_centuries(&mut self, centuries: i64) {
        self.advance(centuries as f64 * 36_525.0 * DAY_S);
    }

    /// Jump to an absolute Julian date.
    pub fn set_date(&mut self, jd: f64) {
        let delta = (jd - self.current.epoch) * DAY_S;
        self.advance(delta);
    }

    /// Shift the mean anomaly directly.
    pub fn move_by(&mut self, mean_anomaly_offset: Angle) {
        let unit = self.current.mean_anomaly.unit();
        let mut m = self.current.mean_anomaly.radians() + mean_anomaly_offset.radians();
        if self.current.orbit_type() == OrbitType::Elliptic {
            m = m.rem_euclid(TAU);
        }
        self.current.mean_anomaly = Angle::from_radians(m).to_unit(unit);
    }

    /// Restore the element set the tracker was created with.
    pub fn reset(&mut self) {
        self.current = self.initial.clone();
    }

    fn advance(&mut self, seconds: f64) {
        let unit = self.current.mean_anomaly.unit();
        let mut m = self.current.mean_anomaly.radians() + self.mean_motion * seconds;
        if self.current.orbit_type() == OrbitType::Elliptic {
            m = m.rem_euclid(TAU);
        }
        self.current.mean_anomaly = Angle::from_radians(m).to_unit(unit);
        self.current.epoch += seconds / DAY_S;
    }

    /// Position and velocity of the current elements.
    ///
    /// `axis_mapper` post-multiplies the Z-up inertial state; `None`
    /// selects [`DEFAULT_AXIS_MAPPER`].
    pub fn state_vectors(&self, axis_mapper: Option<Matrix3<f64>>) -> Result<OrbitStateVectors> {
        let mapper = axis_mapper.unwrap_or_else(default_axis_mapper);
        let elems = &self.current;
        let e = elems.eccentricity;
        let mu = elems.grav_param;
        let m = elems.mean_anomaly;

        // eccentric anomaly, true anomaly and radius per conic
        let (nu, r) = match elems.orbit_type() {
            OrbitType::Elliptic => {
                let big_e = NewtonKepler::new(e).solve(m)?.radians();
                let nu = ((1.0 - e * e).sqrt() * big_e.sin()).atan2(big_e.cos() - e);
                let a = elems.semi_major_axis();
                (nu, a * (1.0 - e * big_e.cos()))
            }
            OrbitType::Parabolic => {
                let d = inverse_kepler_parabolic(m)?.radians();
                let nu = 2.0 * d.atan();
                (nu, elems.pericenter_dist * (1.0 + d * d))
            }
            OrbitType::Hyperbolic => {
                let h = HyperbolicKepler::new(e)?.solve(m)?.radians();
                let nu = 2.0 * (((e + 1.0) / (e - 1.0)).sqrt() * (h / 2.0).tanh()).atan();
                let a = elems.semi_major_axis();
                (nu, a * (1.0 - e * h.cosh()))
            }
        };

        let p = elems.semi_latus_rectum();
        let vcoef = (mu / p).sqrt();
        let pos_pf = Vector3::new(r * nu.cos(), r * nu.sin(), 0.0);
        let vel_pf = Vector3::new(-vcoef * nu.sin(), vcoef * (e + nu.cos()), 0.0);

        let rot = Matrix3::from(nalgebra::Rotation3::from_axis_angle(
            &Vector3::z_axis(),
            elems.ascending_node.radians(),
        )) * Matrix3::from(nalgebra::Rotation3::from_axis_angle(
            &Vector3::x_axis(),
            elems.inclination.radians(),
        )) * Matrix3::from(nalgebra::Rotation3::from_axis_angle(
            &Vector3::z_axis(),
            elems.arg_of_pericenter.radians(),
        ));

        Ok(OrbitStateVectors {
            ref_plane: elems.ref_plane.clone(),
            grav_param: mu,
            time: elems.epoch,
            position: mapper * rot * pos_pf,
            velocity: mapper * rot * vel_pf,
        })
    }
}

/// Angle between two vectors in [0, π]
fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a.dot(b) / (a.norm() * b.norm())).clamp(-1.0, 1.0).acos()
}

/// Extract Keplerian elements from a state-vector snapshot.
///
/// `axis_mapper` is applied to position and velocity first (the inverse
/// of whatever mapping produced them); `None` selects
/// [`DEFAULT_AXIS_UNMAPPER`]. Uses vis-viva for the semi-major axis, the
/// angular-momentum vector for inclination and node, and the eccentricity
/// vector for shape and orientation.
pub fn state_vectors_to_elements(
    state: &OrbitStateVectors,
    axis_mapper: Option<Matrix3<f64>>,
) -> Result<KeplerianOrbitElems> {
    let mapper = axis_mapper.unwrap_or_else(default_axis_unmapper);
    let mu = state.grav_param;
    if !(mu > 0.0) {
        return Err(AstrokitError::NumericDomain(format!(
            "gravitational parameter must be positive, got {mu}"
        )));
    }
    let pos = mapper * state.position;
    let vel = mapper * state.velocity;
    let r = pos.norm();
    let v2 = vel.norm_squared();
    if r == 0.0 {
        return Err(AstrokitError::NumericDomain(
            "state vector at the singularity r = 0".into(),
        ));
    }

    let h_vec = pos.cross(&vel);
    let h = h_vec.norm();
    let e_vec = ((v2 - mu / r) * pos - pos.dot(&vel) * vel) / mu;
    let e = e_vec.norm();
    let p = h * h / mu;

    // vis-viva; a is negative for hyperbolic states
    let energy = v2 / 2.0 - mu / r;
    let parabolic = (e - 1.0).abs() < 1e-12;

    let incl = angle_between(&h_vec, &Vector3::z());
    let n_vec = Vector3::new(-h_vec.y, h_vec.x, 0.0);
    let n_len = n_vec.norm();

    let node = if incl.abs() < 1e-12 {
        0.0
    } else {
        h_vec.x.atan2(-h_vec.y).rem_euclid(TAU)
    };

    let argp = if e < 1e-12 {
        0.0
    } else if n_len < 1e-12 {
        // equatorial, non-circular
        let angle = e_vec.y.atan2(e_vec.x).rem_euclid(TAU);
        if h_vec.z >= 0.0 {
            angle
        } else {
            (-angle).rem_euclid(TAU)
        }
    } else {
        let angle = angle_between(&n_vec, &e_vec);
        if e_vec.z >= 0.0 {
            angle
        } else {
            (-angle).rem_euclid(TAU)
        }
    };

    // true anomaly with the radial-velocity quadrant rule
    let nu = if e > 1e-12 {
        let angle = angle_between(&e_vec, &pos);
        if pos.dot(&vel) >= 0.0 {
            angle
        } else {
            (-angle).rem_euclid(TAU)
        }
    } else if n_len < 1e-12 {
        let angle = (pos.x / r).clamp(-1.0, 1.0).acos();
        if vel.x <= 0.0 {
            angle
        } else {
            (-angle).rem_euclid(TAU)
        }
    } else {
        let angle = angle_between(&n_vec, &pos);
        if pos.z >= 0.0 {
            angle
        } else {
            (-angle).rem_euclid(TAU)
        }
    };

    // anomaly conversions back to mean anomaly
    let (q, mean_anomaly) = if parabolic {
        let d = (nu_signed(nu) / 2.0).tan();
        (p / 2.0, 0.5 * d + d * d * d / 6.0)
    } else if e < 1.0 {
        let a = -mu / (2.0 * energy);
        let big_e = 2.0 * (((1.0 - e) / (1.0 + e)).sqrt() * (nu / 2.0).tan()).atan();
        let m = (big_e - e * big_e.sin()).rem_euclid(TAU);
        (a * (1.0 - e), m)
    } else {
        let a = -mu / (2.0 * energy); // negative
        let nu_s = nu_signed(nu);
        let big_h = 2.0 * ((nu_s / 2.0).tan() / ((e + 1.0) / (e - 1.0)).sqrt()).atanh();
        let m = e * big_h.sinh() - big_h;
        (a * (1.0 - e), m)
    };

    KeplerianOrbitElems {
        ref_plane: state.ref_plane.clone(),
        epoch: state.time,
        grav_param: mu,
        pericenter_dist: q,
        period: f64::NAN,
        eccentricity: e,
        inclination: Angle::from_radians(incl),
        ascending_node: Angle::from_radians(node),
        arg_of_pericenter: Angle::from_radians(argp),
        mean_anomaly: Angle::from_radians(mean_anomaly),
    }
    .completed()
}

/// Fold an angle in [0, 2π) onto (−π, π]
fn nu_signed(nu: f64) -> f64 {
    if nu > PI {
        nu - TAU
    } else {
        nu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{AU_M, GM_EARTH, GM_SUN, J2000};
    use approx::assert_relative_eq;

    fn earth_like() -> KeplerianOrbitElems {
        KeplerianOrbitElems {
            ref_plane: Some("Ecliptic".into()),
            epoch: J2000,
            grav_param: GM_SUN,
            pericenter_dist: AU_M * (1.0 - 0.0167),
            period: f64::NAN,
            eccentricity: 0.0167,
            inclination: Angle::from_degrees(0.0),
            ascending_node: Angle::from_degrees(0.0),
            arg_of_pericenter: Angle::from_degrees(102.9),
            mean_anomaly: Angle::from_degrees(100.46),
        }
    }

    #[test]
    fn test_completed_fills_period() {
        let e = earth_like().completed().unwrap();
        assert_relative_eq!(e.period / DAY_S, 365.25, epsilon = 0.3);
    }

    #[test]
    fn test_completed_derives_mu_from_period() {
        let mut elems = earth_like();
        elems.grav_param = f64::NAN;
        elems.period = 365.25 * DAY_S;
        let e = elems.completed().unwrap();
        assert_relative_eq!(e.grav_param, GM_SUN, max_relative = 1e-3);
    }

    #[test]
    fn test_completed_rejects_negative_eccentricity() {
        let mut elems = earth_like();
        elems.eccentricity = -0.1;
        assert!(elems.completed().is_err());
    }

    #[test]
    fn test_hyperbolic_period_is_infinite() {
        let mut elems = earth_like();
        elems.eccentricity = 1.5;
        let e = elems.completed().unwrap();
        assert!(e.period.is_infinite());
        assert!(e.semi_major_axis() < 0.0);
    }

    #[test]
    fn test_tracker_advances_only_mean_anomaly() {
        let mut tracker = KeplerianSatelliteTracker::new(earth_like()).unwrap();
        let before = tracker.elements().clone();
        tracker.add_days(10);
        let after = tracker.elements();
        assert_relative_eq!(
            after.mean_anomaly.degrees(),
            (before.mean_anomaly.degrees() + 360.0 * 10.0 / (before.period / DAY_S))
                .rem_euclid(360.0),
            epsilon = 1e-6
        );
        assert_eq!(after.eccentricity, before.eccentricity);
        assert_eq!(after.pericenter_dist, before.pericenter_dist);
        assert_relative_eq!(after.epoch, before.epoch + 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tracker_reset() {
        let mut tracker = KeplerianSatelliteTracker::new(earth_like()).unwrap();
        let m0 = tracker.elements().mean_anomaly;
        tracker.add_years(3);
        tracker.reset();
        assert_eq!(tracker.elements().mean_anomaly, m0);
    }

    #[test]
    fn test_tracker_full_period_closes() {
        let mut tracker = KeplerianSatelliteTracker::new(earth_like()).unwrap();
        let m0 = tracker.elements().mean_anomaly.degrees();
        let period = tracker.elements().period;
        tracker.add_seconds(period.round() as i64);
        let m1 = tracker.elements().mean_anomaly.degrees();
        assert_relative_eq!(m0, m1, epsilon = 1e-3);
    }

    #[test]
    fn test_state_vector_radius_at_perihelion() {
        let mut elems = earth_like();
        elems.mean_anomaly = Angle::from_degrees(0.0);
        let tracker = KeplerianSatelliteTracker::new(elems).unwrap();
        let sv = tracker.state_vectors(None).unwrap();
        assert_relative_eq!(
            sv.position.norm(),
            AU_M * (1.0 - 0.0167),
            max_relative = 1e-10
        );
    }

    #[test]
    fn test_round_trip_elements_state_vectors() {
        let cases = [
            (0.0167, 0.0, 0.0, 102.9, 100.46),
            (0.2, 23.4, 45.0, 271.0, 30.0),
            (0.7, 89.0, 200.0, 10.0, 300.0),
            (0.05, 120.0, 310.0, 95.0, 5.0),
        ];
        for &(ecc, inc, node, argp, ma) in &cases {
            let elems = KeplerianOrbitElems {
                ref_plane: None,
                epoch: J2000,
                grav_param: GM_SUN,
                pericenter_dist: AU_M * (1.0 - ecc),
                period: f64::NAN,
                eccentricity: ecc,
                inclination: Angle::from_degrees(inc),
                ascending_node: Angle::from_degrees(node),
                arg_of_pericenter: Angle::from_degrees(argp),
                mean_anomaly: Angle::from_degrees(ma),
            }
            .completed()
            .unwrap();
            let tracker = KeplerianSatelliteTracker::new(elems.clone()).unwrap();
            let sv = tracker.state_vectors(None).unwrap();
            let back = state_vectors_to_elements(&sv, None).unwrap();

            assert_relative_eq!(back.eccentricity, ecc, max_relative = 1e-10, epsilon = 1e-12);
            assert_relative_eq!(
                back.pericenter_dist,
                elems.pericenter_dist,
                max_relative = 1e-10
            );
            assert_relative_eq!(
                back.inclination.degrees(),
                inc,
                max_relative = 1e-10,
                epsilon = 1e-9
            );
            assert_relative_eq!(
                back.ascending_node.degrees().rem_euclid(360.0),
                node.rem_euclid(360.0),
                max_relative = 1e-10,
                epsilon = 1e-9
            );
            assert_relative_eq!(
                back.arg_of_pericenter.degrees().rem_euclid(360.0),
                argp.rem_euclid(360.0),
                max_relative = 1e-9,
                epsilon = 1e-8
            );
            assert_relative_eq!(
                back.mean_anomaly.degrees().rem_euclid(360.0),
                ma.rem_euclid(360.0),
                max_relative = 1e-9,
                epsilon = 1e-8
            );
        }
    }

    #[test]
    fn test_round_trip_hyperbolic() {
        let elems = KeplerianOrbitElems {
            ref_plane: None,
            epoch: J2000,
            grav_param: GM_SUN,
            pericenter_dist: 0.5 * AU_M,
            period: f64::NAN,
            eccentricity: 1.3,
            inclination: Angle::from_degrees(15.0),
            ascending_node: Angle::from_degrees(60.0),
            arg_of_pericenter: Angle::from_degrees(30.0),
            mean_anomaly: Angle::from_degrees(40.0),
        }
        .completed()
        .unwrap();
        let tracker = KeplerianSatelliteTracker::new(elems.clone()).unwrap();
        let sv = tracker.state_vectors(None).unwrap();
        let back = state_vectors_to_elements(&sv, None).unwrap();
        assert_relative_eq!(back.eccentricity, 1.3, max_relative = 1e-10);
        assert_relative_eq!(back.pericenter_dist, 0.5 * AU_M, max_relative = 1e-9);
        assert_relative_eq!(back.mean_anomaly.degrees(), 40.0, max_relative = 1e-8);
    }

    #[test]
    fn test_from_state_vectors_leo() {
        // circular-ish LEO in the default mapped frame
        let r = 6_778_137.0;
        let v = (GM_EARTH / r).sqrt();
        let state = OrbitStateVectors {
            ref_plane: Some("Equator".into()),
            grav_param: GM_EARTH,
            time: J2000,
            // default unmapper sends (x, y, z) -> (x, z, -y); start from a
            // state already expressed in the mapped convention
            position: default_axis_mapper() * Vector3::new(r, 0.0, 0.0),
            velocity: default_axis_mapper() * Vector3::new(0.0, v, 0.0),
        };
        let tracker = KeplerianSatelliteTracker::from_state_vectors(&state).unwrap();
        let elems = tracker.elements();
        assert!(elems.eccentricity < 1e-10);
        assert_relative_eq!(elems.pericenter_dist, r, max_relative = 1e-10);
        assert_relative_eq!(elems.period, TAU * (r.powi(3) / GM_EARTH).sqrt(), max_relative = 1e-10);
    }

    #[test]
    fn test_axis_mapper_round_trip_consistency() {
        let tracker = KeplerianSatelliteTracker::new(earth_like()).unwrap();
        let mapped = tracker.state_vectors(None).unwrap();
        let raw = tracker
            .state_vectors(Some(Matrix3::identity()))
            .unwrap();
        // the default mapper sends (x, y, z) to (x, -z, y)
        assert_relative_eq!(mapped.position.x, raw.position.x, epsilon = 1.0);
        assert_relative_eq!(mapped.position.y, -raw.position.z, epsilon = 1.0);
        assert_relative_eq!(mapped.position.z, raw.position.y, epsilon = 1.0);
    }

    #[test]
    fn test_equinoctial_round_trip() {
        let elems = earth_like().completed().unwrap();
        let eq = EquinoctialOrbitElems::from(&elems);
        let back = KeplerianOrbitElems::from(&eq);
        assert_relative_eq!(back.eccentricity, elems.eccentricity, epsilon = 1e-12);
        assert_relative_eq!(
            back.mean_anomaly.radians().rem_euclid(TAU),
            elems.mean_anomaly.radians().rem_euclid(TAU),
            epsilon = 1e-10
        );
        assert_relative_eq!(
            back.inclination.radians(),
            elems.inclination.radians(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_orbit_params_preserves_no_data() {
        let params = OrbitParams {
            eccentricity: Some(0.3),
            pericenter_dist: Some(1.0e11),
            ..Default::default()
        };
        let kep = KeplerianOrbitElems::from(&params);
        assert!(kep.mean_anomaly.is_no_data());
        assert!(kep.epoch.is_nan());
        assert_eq!(kep.eccentricity, 0.3);
        let back = OrbitParams::from(&kep);
        assert_eq!(back.mean_anomaly_deg, None);
        assert_eq!(back.eccentricity, Some(0.3));
        assert_eq!(back.epoch, None);
    }

    #[test]
    fn test_move_by_wraps_elliptic() {
        let mut tracker = KeplerianSatelliteTracker::new(earth_like()).unwrap();
        tracker.move_by(Angle::from_degrees(300.0));
        let m = tracker.elements().mean_anomaly.degrees();
        assert!((0.0..360.0).contains(&m));
    }

    #[test]
    fn test_display() {
        let elems = earth_like().completed().unwrap();
        let s = format!("{elems}");
        assert!(s.contains("e=0.016700"));
    }
}
