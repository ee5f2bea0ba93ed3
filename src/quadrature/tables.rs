//! Gauss–Kronrod node and weight tables
//!
//! The workhorse pairs (G7, K15) and (G10, K21) are compiled in at full
//! precision (QUADPACK values). Higher orders are derived once on demand:
//! Gauss nodes from Newton iteration on the Legendre recurrence, the new
//! Kronrod abscissae from the Stieltjes polynomial roots bracketed by the
//! interlacing property, and the Kronrod weights by integrating each
//! Lagrange basis polynomial with an auxiliary Gauss rule of sufficient
//! degree. Derived rules are cached process-wide behind a lock; the
//! tables themselves are immutable once built.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex, OnceLock};

use crate::specfun::{
    legendre_eval, legendre_series_eval, stieltjes_legendre_coefficients,
};
use crate::{AstrokitError, Result};

/// One abscissa of a Gauss–Kronrod pair
///
/// `x` is the non-negative abscissa (rules are symmetric; x > 0 entries
/// count at ±x). `wk` is the Kronrod weight; `wg` the Gauss weight, zero
/// at Kronrod-only nodes.
#[derive(Debug, Clone, Copy)]
pub struct GkPoint {
    pub x: f64,
    pub wk: f64,
    pub wg: f64,
}

/// A (G_n, K_{2n+1}) rule pair over [-1, 1]
#[derive(Debug, Clone)]
pub struct GkRule {
    /// Gauss order n
    pub order: usize,
    /// Non-negative abscissae, descending; last entry is x = 0 when the
    /// node count is odd
    pub points: Vec<GkPoint>,
}

// (G7, K15): abscissae and weights from QUADPACK dqk15.
// Odd-index entries are the Gauss nodes.
const X_K15: [f64; 8] = [
    0.991_455_371_120_813,
    0.949_107_912_342_759,
    0.864_864_423_359_769,
    0.741_531_185_599_394,
    0.586_087_235_467_691,
    0.405_845_151_377_397,
    0.207_784_955_007_898,
    0.0,
];
const W_K15: [f64; 8] = [
    0.022_935_322_010_529,
    0.063_092_092_629_979,
    0.104_790_010_322_250,
    0.140_653_259_715_525,
    0.169_004_726_639_267,
    0.190_350_578_064_785,
    0.204_432_940_075_298,
    0.209_482_141_084_728,
];
const W_G7: [f64; 4] = [
    0.129_484_966_168_870,
    0.279_705_391_489_277,
    0.381_830_050_505_119,
    0.417_959_183_673_469,
];

// (G10, K21): abscissae and weights from QUADPACK dqk21.
const X_K21: [f64; 11] = [
    0.995_657_163_025_808,
    0.973_906_528_517_172,
    0.930_157_491_355_708,
    0.865_063_366_688_985,
    0.780_817_726_586_417,
    0.679_409_568_299_024,
    0.562_757_134_668_605,
    0.433_395_394_129_247,
    0.294_392_862_701_460,
    0.148_874_338_981_631,
    0.0,
];
const W_K21: [f64; 11] = [
    0.011_694_638_867_371,
    0.032_558_162_307_964,
    0.054_755_896_574_352,
    0.075_039_674_810_919,
    0.093_125_454_583_697,
    0.109_387_158_802_298,
    0.123_491_976_262_066,
    0.134_709_217_311_473,
    0.142_775_938_577_060,
    0.147_739_104_901_338,
    0.149_445_554_002_917,
];
const W_G10: [f64; 5] = [
    0.066_671_344_308_688,
    0.149_451_349_150_581,
    0.219_086_362_515_982,
    0.269_266_719_309_996,
    0.295_524_224_714_753,
];

fn rule_from_tables(order: usize, xk: &[f64], wk: &[f64], wg: &[f64]) -> GkRule {
    let gauss_at_center = order % 2 == 1;
    let points = xk
        .iter()
        .zip(wk.iter())
        .enumerate()
        .map(|(i, (&x, &w))| {
            // odd indices are Gauss nodes; for odd n the centre is too
            let wg_here = if i % 2 == 1 {
                wg[i / 2]
            } else if gauss_at_center && i == xk.len() - 1 {
                wg[wg.len() - 1]
            } else {
                0.0
            };
            GkPoint {
                x,
                wk: w,
                wg: wg_here,
            }
        })
        .collect();
    GkRule { order, points }
}

/// Roots of P_n, ascending, by Newton iteration on the recurrence.
fn gauss_nodes(n: usize) -> Vec<f64> {
    let mut nodes = Vec::with_capacity(n);
    for i in 1..=n {
        // Tricomi-style initial guess
        let mut x = (PI * (i as f64 - 0.25) / (n as f64 + 0.5)).cos();
        for _ in 0..100 {
            let (p, dp) = legendre_eval(n, x);
            let dx = p / dp;
            x -= dx;
            if dx.abs() < 1e-16 {
                break;
            }
        }
        nodes.push(x);
    }
    nodes.sort_by(|a, b| a.partial_cmp(b).unwrap());
    nodes
}

/// Gauss–Legendre weights for a node set: w = 2 / ((1 − x²) P'ₙ(x)²).
fn gauss_weights(n: usize, nodes: &[f64]) -> Vec<f64> {
    nodes
        .iter()
        .map(|&x| {
            let (_, dp) = legendre_eval(n, x);
            2.0 / ((1.0 - x * x) * dp * dp)
        })
        .collect()
}

/// Find the root of the Stieltjes series inside (lo, hi) by bisection
/// followed by Newton polishing.
fn stieltjes_root(basis: &[f64], mut lo: f64, mut hi: f64) -> f64 {
    let (mut flo, _) = legendre_series_eval(basis, lo);
    for _ in 0..60 {
        let mid = 0.5 * (lo + hi);
        let (fmid, _) = legendre_series_eval(basis, mid);
        if (fmid > 0.0) == (flo > 0.0) {
            lo = mid;
            flo = fmid;
        } else {
            hi = mid;
        }
    }
    let mut x = 0.5 * (lo + hi);
    for _ in 0..5 {
        let (f, df) = legendre_series_eval(basis, x);
        if df == 0.0 {
            break;
        }
        x -= f / df;
    }
    x
}

/// Build a full (G_n, K_{2n+1}) rule numerically.
fn compute_rule(n: usize) -> Result<GkRule> {
    if n < 2 {
        return Err(AstrokitError::NumericDomain(format!(
            "Gauss-Kronrod order {n} too small"
        )));
    }
    let g_nodes = gauss_nodes(n);
    let g_weights = gauss_weights(n, &g_nodes);

    // the n+1 Stieltjes roots interlace the Gauss nodes
    let basis = stieltjes_legendre_coefficients(n)?;
    let mut brackets = Vec::with_capacity(n + 1);
    brackets.push((-1.0, g_nodes[0]));
    for w in g_nodes.windows(2) {
        brackets.push((w[0], w[1]));
    }
    brackets.push((g_nodes[n - 1], 1.0));
    let s_nodes: Vec<f64> = brackets
        .iter()
        .map(|&(lo, hi)| stieltjes_root(&basis, lo, hi))
        .collect();

    // all 2n+1 Kronrod abscissae, ascending, tagged with the Gauss weight
    // where the node is shared
    let mut all: Vec<(f64, f64)> = g_nodes
        .iter()
        .zip(g_weights.iter())
        .map(|(&x, &w)| (x, w))
        .chain(s_nodes.iter().map(|&x| (x, 0.0)))
        .collect();
    all.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    // Kronrod weights: wk_j = ∫ l_j(x) dx over [-1, 1], the Lagrange
    // basis integrated exactly by an auxiliary Gauss rule (degree 2n
    // integrand needs n+1 Gauss points)
    let aux_n = n + 1;
    let aux_nodes = gauss_nodes(aux_n);
    let aux_weights = gauss_weights(aux_n, &aux_nodes);
    let xs: Vec<f64> = all.iter().map(|p| p.0).collect();
    let wk: Vec<f64> = (0..xs.len())
        .map(|j| {
            aux_nodes
                .iter()
                .zip(aux_weights.iter())
                .map(|(&gx, &gw)| {
                    let mut l = 1.0;
                    for (k, &xk) in xs.iter().enumerate() {
                        if k != j {
                            l *= (gx - xk) / (xs[j] - xk);
                        }
                    }
                    gw * l
                })
                .sum()
        })
        .collect();

    // fold the symmetric rule into non-negative abscissae, descending
    let m = xs.len() / 2;
    let mut points = Vec::with_capacity(m + 1);
    for j in (m + 1..xs.len()).rev() {
        points.push(GkPoint {
            x: xs[j],
            wk: wk[j],
            wg: all[j].1,
        });
    }
    points.push(GkPoint {
        x: 0.0,
        wk: wk[m],
        wg: all[m].1,
    });
    Ok(GkRule { order: n, points })
}

/// Look up or build the rule pair for Gauss order n.
///
/// Orders 7 and 10 come from the compiled tables; other supported orders
/// (15, 20, 25, 30) are computed once and cached for the process.
pub fn nodes_and_weights(n: usize) -> Result<Arc<GkRule>> {
    static CACHE: OnceLock<Mutex<HashMap<usize, Arc<GkRule>>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = cache.lock().unwrap();
    if let Some(rule) = map.get(&n) {
        return Ok(rule.clone());
    }
    let rule = match n {
        7 => rule_from_tables(7, &X_K15, &W_K15, &W_G7),
        10 => rule_from_tables(10, &X_K21, &W_K21, &W_G10),
        _ => compute_rule(n)?,
    };
    let rule = Arc::new(rule);
    map.insert(n, rule.clone());
    Ok(rule)
}
