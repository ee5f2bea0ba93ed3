//! Explicit Runge–Kutta integration with dense output
//!
//! One engine drives two tableau presets: Bogacki–Shampine 3(2)
//! ([`RungeKutta::rk23`]: error order 2, method order 3, 3 stages, cubic
//! dense output) and Dormand–Prince 5(4) ([`RungeKutta::rk45`]: error
//! order 4, method order 5, 6 stages, quartic dense output). Step control
//! is the classical embedded-pair scheme: the RMS norm of
//! e/(atol + rtol·max(|y|, |y_new|)) decides acceptance, and the step is
//! rescaled by safety·norm^(−1/(q+1)) clamped into [0.2, 10].
//!
//! After every accepted step a polynomial patch
//! y(t₀ + τh) = y₀ + h·Q·[τ, τ², …] is stored; [`RungeKutta::sol`]
//! binary-searches the patch covering t and evaluates it. The driver
//! state walks `Processing → Succeeded` at t_end, or `Failed` after
//! repeated rejections push the step under the floor; cancellation is
//! cooperative through [`RungeKutta::cancel`].
//!
//! ```
//! use astrokit::ode::RungeKutta;
//!
//! let mut solver = RungeKutta::rk45(
//!     |_t: f64, y: &[f64]| vec![y[1], -y[0]],
//!     0.0,
//!     vec![1.0, 0.0],
//!     std::f64::consts::TAU,
//! );
//! solver.solve().unwrap();
//! let y = solver.y();
//! assert!((y[0] - 1.0).abs() < 1e-6);
//! ```

use crate::{AstrokitError, Result};

/// Driver state of an integration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OdeStatus {
    /// Integration still has ground to cover
    Processing,
    /// Reached t_end
    Succeeded,
    /// Step size collapsed or the driver was cancelled
    Failed,
}

/// Butcher tableau and dense-output table of an embedded pair
struct Tableau {
    c: &'static [f64],
    a: &'static [&'static [f64]],
    b: &'static [f64],
    e: &'static [f64],
    p: &'static [&'static [f64]],
    /// Order of the embedded error estimate (q)
    error_order: usize,
    stages: usize,
    dense_order: usize,
}

// Bogacki–Shampine 3(2)
const RK23_C: [f64; 3] = [0.0, 0.5, 0.75];
const RK23_A1: [f64; 1] = [0.5];
const RK23_A2: [f64; 2] = [0.0, 0.75];
const RK23_A: [&[f64]; 3] = [&[], &RK23_A1, &RK23_A2];
const RK23_B: [f64; 3] = [2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0];
const RK23_E: [f64; 4] = [5.0 / 72.0, -1.0 / 12.0, -1.0 / 9.0, 1.0 / 8.0];
const RK23_P: [&[f64]; 4] = [
    &[1.0, -4.0 / 3.0, 5.0 / 9.0],
    &[0.0, 1.0, -2.0 / 3.0],
    &[0.0, 4.0 / 3.0, -8.0 / 9.0],
    &[0.0, -1.0, 1.0],
];

// Dormand–Prince 5(4)
const RK45_C: [f64; 6] = [0.0, 0.2, 0.3, 0.8, 8.0 / 9.0, 1.0];
const RK45_A1: [f64; 1] = [0.2];
const RK45_A2: [f64; 2] = [3.0 / 40.0, 9.0 / 40.0];
const RK45_A3: [f64; 3] = [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0];
const RK45_A4: [f64; 4] = [
    19372.0 / 6561.0,
    -25360.0 / 2187.0,
    64448.0 / 6561.0,
    -212.0 / 729.0,
];
const RK45_A5: [f64; 5] = [
    9017.0 / 3168.0,
    -355.0 / 33.0,
    46732.0 / 5247.0,
    49.0 / 176.0,
    -5103.0 / 18656.0,
];
const RK45_A: [&[f64]; 6] = [&[], &RK45_A1, &RK45_A2, &RK45_A3, &RK45_A4, &RK45_A5];
const RK45_B: [f64; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];
const RK45_E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];
const RK45_P: [&[f64]; 7] = [
    &[
        1.0,
        -8048581381.0 / 2820520608.0,
        8663915743.0 / 2820520608.0,
        -12715105075.0 / 11282082432.0,
    ],
    &[0.0, 0.0, 0.0, 0.0],
    &[
        0.0,
        131558114200.0 / 32700410799.0,
        -68118460800.0 / 10900136933.0,
        87487479700.0 / 32700410799.0,
    ],
    &[
        0.0,
        -1754552775.0 / 470086768.0,
        14199869525.0 / 1410260304.0,
        -10690763975.0 / 1880347072.0,
    ],
    &[
        0.0,
        127303824393.0 / 49829197408.0,
        -318862633887.0 / 49829197408.0,
        701980252875.0 / 199316789632.0,
    ],
    &[
        0.0,
        -282668133.0 / 205662961.0,
        2019193451.0 / 616988883.0,
        -1453857185.0 / 822651844.0,
    ],
    &[
        0.0,
        40617522.0 / 29380423.0,
        -110615467.0 / 29380423.0,
        69997945.0 / 29380423.0,
    ],
];

const RK23_TABLEAU: Tableau = Tableau {
    c: &RK23_C,
    a: &RK23_A,
    b: &RK23_B,
    e: &RK23_E,
    p: &RK23_P,
    error_order: 2,
    stages: 3,
    dense_order: 3,
};

const RK45_TABLEAU: Tableau = Tableau {
    c: &RK45_C,
    a: &RK45_A,
    b: &RK45_B,
    e: &RK45_E,
    p: &RK45_P,
    error_order: 4,
    stages: 6,
    dense_order: 4,
};

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
/// Consecutive-rejection safeguard before the driver gives up
const MAX_REJECTIONS: usize = 64;

/// One dense-output patch over [t0, t0 + h]
#[derive(Debug, Clone)]
pub struct DenseSegment {
    pub t0: f64,
    pub h: f64,
    base: Vec<f64>,
    /// n × dense_order table; y(t₀ + τh) = base + h·q·[τ, τ², …]
    q: Vec<Vec<f64>>,
}

impl DenseSegment {
    /// Evaluate the patch at t (valid inside its own interval)
    pub fn eval(&self, t: f64) -> Vec<f64> {
        let tau = (t - self.t0) / self.h;
        let order = self.q.first().map_or(0, |row| row.len());
        let mut powers = Vec::with_capacity(order);
        let mut p = tau;
        for _ in 0..order {
            powers.push(p);
            p *= tau;
        }
        self.base
            .iter()
            .zip(self.q.iter())
            .map(|(&y0, row)| {
                y0 + self.h
                    * row
                        .iter()
                        .zip(powers.iter())
                        .map(|(&qk, &pk)| qk * pk)
                        .sum::<f64>()
            })
            .collect()
    }
}

/// Adaptive explicit Runge–Kutta integrator
pub struct RungeKutta<F: FnMut(f64, &[f64]) -> Vec<f64>> {
    f: F,
    tableau: &'static Tableau,
    pub rtol: f64,
    pub atol: f64,
    pub max_step: f64,
    t: f64,
    y: Vec<f64>,
    t_end: f64,
    direction: f64,
    h_abs: f64,
    f_cur: Vec<f64>,
    status: OdeStatus,
    segments: Vec<DenseSegment>,
    rejections: usize,
    pub steps_taken: usize,
}

impl<F: FnMut(f64, &[f64]) -> Vec<f64>> RungeKutta<F> {
    /// Bogacki–Shampine 3(2) pair
    pub fn rk23(f: F, t0: f64, y0: Vec<f64>, t_end: f64) -> Self {
        Self::with_tableau(f, t0, y0, t_end, &RK23_TABLEAU)
    }

    /// Dormand–Prince 5(4) pair
    pub fn rk45(f: F, t0: f64, y0: Vec<f64>, t_end: f64) -> Self {
        Self::with_tableau(f, t0, y0, t_end, &RK45_TABLEAU)
    }

    fn with_tableau(mut f: F, t0: f64, y0: Vec<f64>, t_end: f64, tableau: &'static Tableau) -> Self {
        let f0 = f(t0, &y0);
        let direction = if t_end >= t0 { 1.0 } else { -1.0 };
        let mut solver = RungeKutta {
            f,
            tableau,
            rtol: 1e-3,
            atol: 1e-6,
            max_step: f64::INFINITY,
            t: t0,
            y: y0,
            t_end,
            direction,
            h_abs: 0.0,
            f_cur: f0,
            status: if t0 == t_end {
                OdeStatus::Succeeded
            } else {
                OdeStatus::Processing
            },
            segments: Vec::new(),
            rejections: 0,
            steps_taken: 0,
        };
        solver.h_abs = solver.initial_step();
        solver
    }

    /// Set both tolerances (builder style)
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self.h_abs = self.initial_step();
        self
    }

    pub fn status(&self) -> OdeStatus {
        self.status
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Mark the integration failed; `step` becomes a no-op.
    pub fn cancel(&mut self) {
        self.status = OdeStatus::Failed;
    }

    /// Stored dense-output patches, ascending by start time.
    pub fn segments(&self) -> &[DenseSegment] {
        &self.segments
    }

    /// Starting step so that h·‖f₀‖ stays small against the state scale,
    /// then refined with one Euler probe (the SciPy heuristic).
    fn initial_step(&mut self) -> f64 {
        let order = self.tableau.error_order + 1;
        let n = self.y.len();
        if n == 0 {
            return f64::INFINITY;
        }
        let scale: Vec<f64> = self.y.iter().map(|&yi| self.atol + self.rtol * yi.abs()).collect();
        let d0 = rms(&self.y.iter().zip(&scale).map(|(&y, &s)| y / s).collect::<Vec<_>>());
        let d1 = rms(&self.f_cur.iter().zip(&scale).map(|(&f, &s)| f / s).collect::<Vec<_>>());
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let y1: Vec<f64> = self
            .y
            .iter()
            .zip(self.f_cur.iter())
            .map(|(&y, &f)| y + self.direction * h0 * f)
            .collect();
        let f1 = (self.f)(self.t + self.direction * h0, &y1);
        let d2 = rms(
            &f1.iter()
                .zip(self.f_cur.iter())
                .zip(&scale)
                .map(|((&a, &b), &s)| (a - b) / s)
                .collect::<Vec<_>>(),
        ) / h0;
        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / order as f64)
        };
        (100.0 * h0).min(h1).min(self.max_step).min((self.t_end - self.t).abs())
    }

    /// Advance one accepted step (possibly after several rejections).
    pub fn step(&mut self) -> Result<()> {
        if self.status != OdeStatus::Processing {
            return Ok(());
        }
        let tbl = self.tableau;
        let n = self.y.len();
        let min_step = 10.0 * f64::EPSILON * self.t.abs().max(1.0);

        loop {
            if self.h_abs < min_step {
                self.status = OdeStatus::Failed;
                return Err(AstrokitError::Convergence {
                    iterations: self.steps_taken,
                    residual: self.h_abs,
                });
            }
            let mut h = self.direction * self.h_abs;
            // clamp the last step onto t_end; remember that it is final so
            // rounding in t + h cannot strand the driver one ulp short
            let mut final_step = false;
            if (self.t + h - self.t_end) * self.direction >= 0.0 {
                h = self.t_end - self.t;
                final_step = true;
            }

            // stage derivatives
            let mut k: Vec<Vec<f64>> = Vec::with_capacity(tbl.stages + 1);
            k.push(self.f_cur.clone());
            for i in 1..tbl.stages {
                let mut yt = self.y.clone();
                for (j, kj) in k.iter().enumerate().take(i) {
                    let aij = tbl.a[i][j];
                    if aij != 0.0 {
                        for (yt_m, &kj_m) in yt.iter_mut().zip(kj.iter()) {
                            *yt_m += h * aij * kj_m;
                        }
                    }
                }
                k.push((self.f)(self.t + tbl.c[i] * h, &yt));
            }
            let mut y_new = self.y.clone();
            for (i, ki) in k.iter().enumerate() {
                let bi = tbl.b[i];
                if bi != 0.0 {
                    for (y_m, &ki_m) in y_new.iter_mut().zip(ki.iter()) {
                        *y_m += h * bi * ki_m;
                    }
                }
            }
            let f_new = (self.f)(self.t + h, &y_new);
            k.push(f_new.clone());

            // embedded error estimate
            let mut err = vec![0.0; n];
            for (i, ki) in k.iter().enumerate() {
                let ei = tbl.e[i];
                if ei != 0.0 {
                    for (e_m, &ki_m) in err.iter_mut().zip(ki.iter()) {
                        *e_m += h * ei * ki_m;
                    }
                }
            }
            let norm = rms(
                &err.iter()
                    .enumerate()
                    .map(|(i, &e)| {
                        let scale =
                            self.atol + self.rtol * self.y[i].abs().max(y_new[i].abs());
                        e / scale
                    })
                    .collect::<Vec<_>>(),
            );

            let exponent = -1.0 / (tbl.error_order + 1) as f64;
            if norm <= 1.0 {
                let factor = if norm == 0.0 {
                    MAX_FACTOR
                } else {
                    MAX_FACTOR.min(SAFETY * norm.powf(exponent))
                };
                // dense-output table Q = Kᵀ P
                let q: Vec<Vec<f64>> = (0..n)
                    .map(|m| {
                        (0..tbl.dense_order)
                            .map(|col| {
                                k.iter()
                                    .enumerate()
                                    .map(|(row, krow)| krow[m] * tbl.p[row][col])
                                    .sum()
                            })
                            .collect()
                    })
                    .collect();
                self.segments.push(DenseSegment {
                    t0: self.t,
                    h,
                    base: self.y.clone(),
                    q,
                });

                self.t = if final_step { self.t_end } else { self.t + h };
                self.y = y_new;
                self.f_cur = f_new;
                self.h_abs = (self.h_abs * factor).min(self.max_step);
                self.rejections = 0;
                self.steps_taken += 1;
                if final_step {
                    self.status = OdeStatus::Succeeded;
                }
                return Ok(());
            }

            // rejected: contract and retry
            self.h_abs *= MIN_FACTOR.max(SAFETY * norm.powf(exponent));
            self.rejections += 1;
            if self.rejections > MAX_REJECTIONS {
                self.status = OdeStatus::Failed;
                return Err(AstrokitError::Convergence {
                    iterations: self.steps_taken,
                    residual: norm,
                });
            }
        }
    }

    /// Drive the integration to t_end.
    pub fn solve(&mut self) -> Result<()> {
        const NMAX: usize = 100_000;
        while self.status == OdeStatus::Processing {
            self.step()?;
            if self.steps_taken >= NMAX {
                self.status = OdeStatus::Failed;
                return Err(AstrokitError::Convergence {
                    iterations: self.steps_taken,
                    residual: (self.t_end - self.t).abs(),
                });
            }
        }
        Ok(())
    }

    /// Evaluate the dense output at any time inside the covered span.
    pub fn sol(&self, t: f64) -> Result<Vec<f64>> {
        if self.segments.is_empty() {
            return Err(AstrokitError::TableRange {
                value: t,
                start: self.t,
                end: self.t,
            });
        }
        let t0 = self.segments[0].t0;
        let t1 = self.t;
        let (lo, hi) = if self.direction >= 0.0 { (t0, t1) } else { (t1, t0) };
        if t < lo || t > hi {
            return Err(AstrokitError::TableRange {
                value: t,
                start: lo,
                end: hi,
            });
        }
        // patches are stored in step order; find the last whose start is
        // on the near side of t
        let idx = if self.direction >= 0.0 {
            self.segments.partition_point(|s| s.t0 <= t)
        } else {
            self.segments.partition_point(|s| s.t0 >= t)
        }
        .saturating_sub(1);
        Ok(self.segments[idx].eval(t))
    }
}

fn rms(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    (v.iter().map(|x| x * x).sum::<f64>() / v.len() as f64).sqrt()
}
