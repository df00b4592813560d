//! Saltelli sampling design for first/total-order Sobol estimation.
//!
//! For `n` base samples and `k` variables the design is built from a `2k`
//! dimensional base sequence split into matrices `A` and `B`. Each base row
//! expands into a block of `2k + 2` rows (`k + 2` without second order):
//!
//! ```text
//! A, AB_1 .. AB_k, [BA_1 .. BA_k,] B
//! ```
//!
//! where `AB_i` is `A` with column `i` taken from `B`. The analysis in
//! [`crate::analyze`] relies on exactly this ordering.

use crate::errors::{Result, SobolError};
use crate::sequence::{scrambled_points, SobolSequence, MAX_SCRAMBLED_DIMENSIONS};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Variables and their bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub names: Vec<String>,
    pub bounds: Vec<(f64, f64)>,
}

impl Problem {
    /// Problem whose variables all live on the unit interval
    pub fn unit<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let bounds = vec![(0.0, 1.0); names.len()];
        Self { names, bounds }
    }

    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.names.is_empty() {
            return Err(SobolError::InvalidProblem("problem has no variables".into()));
        }
        if self.names.len() != self.bounds.len() {
            return Err(SobolError::InvalidProblem(format!(
                "{} names but {} bounds",
                self.names.len(),
                self.bounds.len()
            )));
        }
        for (name, (lo, hi)) in self.names.iter().zip(&self.bounds) {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(SobolError::InvalidProblem(format!(
                    "variable {name} has invalid bounds [{lo}, {hi}]"
                )));
            }
        }
        Ok(())
    }
}

/// Shape of a Saltelli design, needed to separate model outputs again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaltelliLayout {
    pub base_samples: usize,
    pub num_vars: usize,
    pub second_order: bool,
}

impl SaltelliLayout {
    /// Rows generated per base sample
    pub fn step(&self) -> usize {
        if self.second_order {
            2 * self.num_vars + 2
        } else {
            self.num_vars + 2
        }
    }

    /// Total number of model evaluations the design requires
    pub fn total_rows(&self) -> usize {
        self.base_samples * self.step()
    }
}

/// Generated design: row-major samples scaled to the problem bounds
#[derive(Debug, Clone, PartialEq)]
pub struct SaltelliDesign {
    pub layout: SaltelliLayout,
    pub rows: Vec<Vec<f64>>,
}

impl SaltelliDesign {
    /// Values of one variable across every row, in design order
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[index]).collect()
    }
}

/// Build a Saltelli design of `n` base samples.
///
/// The base matrix comes from the Sobol sequence after skipping `skip`
/// points (default: the next power of two at or above `n`). When `2k`
/// exceeds the Joe-Kuo table the Owen-scrambled sequence is used instead,
/// seeded from `rng`. Past [`MAX_SCRAMBLED_DIMENSIONS`] the base matrix
/// falls back to pseudo-random draws from `rng`, which keeps the estimator
/// unbiased at a higher variance.
pub fn saltelli_sample<R: Rng + ?Sized>(
    problem: &Problem,
    n: usize,
    second_order: bool,
    skip: Option<usize>,
    rng: &mut R,
) -> Result<SaltelliDesign> {
    if n == 0 {
        return Err(SobolError::EmptySample);
    }
    problem.validate()?;

    let k = problem.num_vars();
    let layout = SaltelliLayout {
        base_samples: n,
        num_vars: k,
        second_order,
    };
    let skip = skip.unwrap_or_else(|| n.next_power_of_two());

    let base = match SobolSequence::generate(2 * k, n, skip) {
        Some(points) => points,
        None => {
            let seed = rng.gen::<u32>();
            match scrambled_points(2 * k, n, skip, seed) {
                Some(points) => {
                    debug!(dims = 2 * k, seed, "using scrambled Sobol base samples");
                    points
                }
                None => {
                    warn!(
                        "{} base dimensions exceed the scrambled Sobol sequence ({}), using pseudo-random base samples",
                        2 * k,
                        MAX_SCRAMBLED_DIMENSIONS
                    );
                    (0..n)
                        .map(|_| (0..2 * k).map(|_| rng.gen::<f64>()).collect())
                        .collect()
                }
            }
        }
    };

    let mut rows = Vec::with_capacity(layout.total_rows());
    for point in &base {
        let (a, b) = point.split_at(k);

        rows.push(a.to_vec());
        for i in 0..k {
            let mut ab = a.to_vec();
            ab[i] = b[i];
            rows.push(ab);
        }
        if second_order {
            for i in 0..k {
                let mut ba = b.to_vec();
                ba[i] = a[i];
                rows.push(ba);
            }
        }
        rows.push(b.to_vec());
    }

    for row in &mut rows {
        for (value, (lo, hi)) in row.iter_mut().zip(&problem.bounds) {
            *value = lo + *value * (hi - lo);
        }
    }

    debug!(
        base_samples = n,
        num_vars = k,
        rows = rows.len(),
        skip,
        "built Saltelli design"
    );

    Ok(SaltelliDesign { layout, rows })
}
