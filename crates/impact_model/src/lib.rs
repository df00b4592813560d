//! Parameterized LCA impact models.
//!
//! Evaluates an impact tree under caller-supplied or default parameter
//! values, propagates parameter uncertainty through it by Monte Carlo and
//! attributes the resulting variance to parameters with Sobol indices.
//!
//! Modules:
//! - `batch`: Scalar/batch values, raw parameter values and sample batches
//! - `parameters`: Parameter declarations, distributions and draws
//! - `transform`: Transform engine feeding the tree
//! - `tree`: Reference impact tree
//! - `scores`: Score collections and per-node records
//! - `model`: Evaluation, uncertainty and sensitivity entry points
//! - `sensitivity`: Sobol analysis over score batches
//! - `config`: TOML configuration with environment overrides
//! - `logging`: Tracing subscriber setup
//! - `errors`: Error types
//!
//! # Example
//! ```
//! use lca_impact_model::{
//!     Distribution, ImpactExpr, ImpactModel, ImpactTreeNode, Parameter, ParameterCollection, Parameters,
//! };
//!
//! let parameters = ParameterCollection::new(vec![Parameter::float(
//!     "mass",
//!     2.0,
//!     Distribution::Uniform { min: 1.0, max: 3.0 },
//! )])
//! .unwrap();
//! let tree = ImpactTreeNode::new("part").with_impact(
//!     "gwp",
//!     ImpactExpr::Product(vec![ImpactExpr::param("mass"), ImpactExpr::constant(4.0)]),
//! );
//! let model = ImpactModel::new(parameters).with_tree(tree);
//!
//! let scores = model.evaluate(Parameters::new()).unwrap();
//! assert_eq!(scores.get("gwp").and_then(|s| s.get(0)), Some(&8.0));
//! ```

pub mod batch;
pub mod config;
pub mod errors;
pub mod logging;
pub mod model;
pub mod parameters;
pub mod scores;
pub mod sensitivity;
pub mod transform;
pub mod tree;

pub use batch::{Batched, DrawScheme, ParameterValue, Parameters, RawValue, SampleBatch};
pub use config::{ImpactConfig, LoggingConfig, SamplingConfig, SensitivityConfig};
pub use errors::{ImpactError, Result};
pub use logging::init_logging;
pub use model::ImpactModel;
pub use parameters::{Distribution, EnumTransform, Parameter, ParameterCollection, ParameterKind};
pub use scores::{LCIAScores, NodeScores};
pub use sensitivity::{SensitivityAnalyzer, SensitivityRecord};
pub use transform::{transform_parameters, TransformedParameters};
pub use tree::{ImpactExpr, ImpactTreeNode, NodeRef};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
