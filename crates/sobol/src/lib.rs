//! Variance-based global sensitivity analysis.
//!
//! Provides the numeric core used to attribute output variance of a model to
//! its inputs:
//!
//! Modules:
//! - `sequence`: Sobol low-discrepancy point generator
//! - `design`: Saltelli sampling design and its layout descriptor
//! - `analyze`: First/total-order index estimation with bootstrap intervals
//! - `stats`: Mean, variance and normal quantile helpers
//! - `errors`: Error type shared by the modules above
//!
//! # Example
//! ```
//! use lca_sobol::{analyze, saltelli_sample, AnalyzeOptions, Problem};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let problem = Problem::unit(["x1", "x2"]);
//! let mut rng = StdRng::seed_from_u64(0);
//! let design = saltelli_sample(&problem, 256, true, None, &mut rng).unwrap();
//! let outputs: Vec<f64> = design.rows.iter().map(|x| 4.0 * x[0] + x[1]).collect();
//!
//! let indices = analyze(&design.layout, &outputs, &AnalyzeOptions::default()).unwrap();
//! assert!(indices.s1[0] > indices.s1[1]);
//! ```

pub mod analyze;
pub mod design;
pub mod errors;
pub mod sequence;
pub mod stats;

pub use analyze::{analyze, AnalyzeOptions, SobolIndices};
pub use design::{saltelli_sample, Problem, SaltelliDesign, SaltelliLayout};
pub use errors::{Result, SobolError};
pub use sequence::{scrambled_points, SobolSequence, MAX_DIMENSIONS, MAX_SCRAMBLED_DIMENSIONS};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
