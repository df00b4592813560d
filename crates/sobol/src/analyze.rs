//! Variance-based sensitivity estimation over a Saltelli design.
//!
//! First-order indices use the Saltelli (2010) estimator
//! `mean(f(B) * (f(AB_i) - f(A))) / Var(Y)`, total-order indices the Jansen
//! estimator `mean((f(A) - f(AB_i))^2) / 2Var(Y)`. Confidence half-widths come
//! from a bootstrap over base samples. Indices are not clamped: small
//! negative values are estimator noise at low sample counts.

use crate::design::SaltelliLayout;
use crate::errors::{Result, SobolError};
use crate::stats::{mean, probit, sample_std_dev, variance};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Bootstrap settings for [`analyze`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    /// Number of bootstrap resamples (0 disables confidence estimation)
    pub num_resamples: usize,
    /// Confidence level of the reported half-widths, in (0, 1)
    pub conf_level: f64,
    /// Seed for the bootstrap; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            num_resamples: 100,
            conf_level: 0.95,
            seed: None,
        }
    }
}

/// Estimated indices, one entry per problem variable in problem order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SobolIndices {
    pub s1: Vec<f64>,
    pub s1_conf: Vec<f64>,
    pub st: Vec<f64>,
    pub st_conf: Vec<f64>,
}

impl SobolIndices {
    fn zeros(k: usize) -> Self {
        Self {
            s1: vec![0.0; k],
            s1_conf: vec![0.0; k],
            st: vec![0.0; k],
            st_conf: vec![0.0; k],
        }
    }
}

/// Model outputs split back into the design matrices
struct Separated {
    a: Vec<f64>,
    b: Vec<f64>,
    ab: Vec<Vec<f64>>,
}

fn separate(layout: &SaltelliLayout, outputs: &[f64]) -> Separated {
    let step = layout.step();
    let k = layout.num_vars;
    let n = layout.base_samples;

    let mut a = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    let mut ab = vec![Vec::with_capacity(n); k];

    for block in outputs.chunks_exact(step) {
        a.push(block[0]);
        for (i, column) in ab.iter_mut().enumerate() {
            column.push(block[1 + i]);
        }
        b.push(block[step - 1]);
    }

    Separated { a, b, ab }
}

fn estimate(a: &[f64], ab: &[f64], b: &[f64], idx: &[usize]) -> (f64, f64) {
    let pooled: Vec<f64> = idx.iter().map(|&j| a[j]).chain(idx.iter().map(|&j| b[j])).collect();
    let var = variance(&pooled);
    if var == 0.0 {
        return (0.0, 0.0);
    }

    let len = idx.len() as f64;
    let first = idx.iter().map(|&j| b[j] * (ab[j] - a[j])).sum::<f64>() / len;
    let total = idx.iter().map(|&j| (a[j] - ab[j]).powi(2)).sum::<f64>() / len;

    (first / var, 0.5 * total / var)
}

/// Compute first- and total-order Sobol indices.
///
/// `outputs` must hold one model evaluation per design row, in the exact
/// order produced by [`crate::saltelli_sample`].
pub fn analyze(
    layout: &SaltelliLayout,
    outputs: &[f64],
    options: &AnalyzeOptions,
) -> Result<SobolIndices> {
    if layout.base_samples == 0 {
        return Err(SobolError::EmptySample);
    }
    if layout.num_vars == 0 {
        return Err(SobolError::InvalidProblem("problem has no variables".into()));
    }
    if !(options.conf_level > 0.0 && options.conf_level < 1.0) {
        return Err(SobolError::InvalidOption(format!(
            "conf_level must lie in (0, 1), got {}",
            options.conf_level
        )));
    }
    if outputs.len() != layout.total_rows() {
        return Err(SobolError::LayoutMismatch {
            expected: layout.total_rows(),
            actual: outputs.len(),
        });
    }

    let k = layout.num_vars;
    let n = layout.base_samples;

    if let Some((row, &value)) = outputs.iter().enumerate().find(|(_, y)| !y.is_finite()) {
        return Err(SobolError::NonFiniteOutput { row, value });
    }

    let m = mean(outputs);
    let sd = variance(outputs).sqrt();
    if !sd.is_finite() {
        return Err(SobolError::InvalidProblem("model output variance overflows".into()));
    }
    if sd == 0.0 {
        warn!("model output has no variance, reporting zero indices");
        return Ok(SobolIndices::zeros(k));
    }
    let normalized: Vec<f64> = outputs.iter().map(|y| (y - m) / sd).collect();
    let Separated { a, b, ab } = separate(layout, &normalized);

    let all: Vec<usize> = (0..n).collect();
    let mut indices = SobolIndices::zeros(k);
    for i in 0..k {
        let (s1, st) = estimate(&a, &ab[i], &b, &all);
        indices.s1[i] = s1;
        indices.st[i] = st;
    }

    if options.num_resamples > 0 {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let resamples: Vec<Vec<usize>> = (0..options.num_resamples)
            .map(|_| (0..n).map(|_| rng.gen_range(0..n)).collect())
            .collect();
        let z = probit(0.5 + options.conf_level / 2.0);

        for i in 0..k {
            let (firsts, totals): (Vec<f64>, Vec<f64>) = resamples
                .iter()
                .map(|idx| estimate(&a, &ab[i], &b, idx))
                .unzip();
            indices.s1_conf[i] = z * sample_std_dev(&firsts);
            indices.st_conf[i] = z * sample_std_dev(&totals);
        }
    }

    debug!(
        base_samples = n,
        num_vars = k,
        resamples = options.num_resamples,
        "estimated Sobol indices"
    );

    Ok(indices)
}
