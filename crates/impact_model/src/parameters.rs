//! Impact model parameters and their collection.
//!
//! A parameter declares a default, how its values are distributed for
//! uncertainty analysis, and how a raw value is transformed into the named
//! numeric inputs consumed by the impact tree.

use crate::batch::{Batched, DrawScheme, ParameterValue, Parameters, RawValue, SampleBatch};
use crate::errors::{ImpactError, Result};
use lca_sobol::stats::probit;
use lca_sobol::{saltelli_sample, Problem};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Normal quantiles are taken on `[EPS, 1 - EPS]` so boundary draws stay finite
const NORMAL_EPS: f64 = 1e-12;

/// Distribution of a float parameter over its real-world domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Always the parameter's default
    Fixed,
    Uniform {
        min: f64,
        max: f64,
    },
    Triangle {
        min: f64,
        mode: f64,
        max: f64,
    },
    /// Normal, optionally truncated by clamping to `[min, max]`
    Normal {
        mean: f64,
        std: f64,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
}

impl Distribution {
    fn validate(&self) -> std::result::Result<(), String> {
        match *self {
            Distribution::Fixed => Ok(()),
            Distribution::Uniform { min, max } => {
                if !(min.is_finite() && max.is_finite() && min <= max) {
                    return Err(format!("uniform bounds [{min}, {max}] are invalid"));
                }
                Ok(())
            }
            Distribution::Triangle { min, mode, max } => {
                if !(min.is_finite() && max.is_finite() && min <= mode && mode <= max) {
                    return Err(format!("triangle ({min}, {mode}, {max}) is invalid"));
                }
                Ok(())
            }
            Distribution::Normal { mean, std, min, max } => {
                if !(mean.is_finite() && std.is_finite() && std >= 0.0) {
                    return Err(format!("normal (mean {mean}, std {std}) is invalid"));
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(format!("normal truncation [{lo}, {hi}] is invalid"));
                    }
                }
                Ok(())
            }
        }
    }

    /// Map a draw `u` in `[0, 1]` onto the distribution (inverse CDF)
    pub fn quantile(&self, default: f64, u: f64) -> f64 {
        let u = u.clamp(0.0, 1.0);
        match *self {
            Distribution::Fixed => default,
            Distribution::Uniform { min, max } => min + u * (max - min),
            Distribution::Triangle { min, mode, max } => {
                let width = max - min;
                if width == 0.0 {
                    return min;
                }
                let split = (mode - min) / width;
                if u < split {
                    min + (u * width * (mode - min)).sqrt()
                } else {
                    max - ((1.0 - u) * width * (max - mode)).sqrt()
                }
            }
            Distribution::Normal { mean, std, min, max } => {
                let z = probit(u.clamp(NORMAL_EPS, 1.0 - NORMAL_EPS));
                let mut value = mean + std * z;
                if let Some(lo) = min {
                    value = value.max(lo);
                }
                if let Some(hi) = max {
                    value = value.min(hi);
                }
                value
            }
        }
    }
}

/// Float parameter: transforms to itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatParameter {
    pub default: f64,
    #[serde(default = "fixed_distribution")]
    pub distribution: Distribution,
}

fn fixed_distribution() -> Distribution {
    Distribution::Fixed
}

/// How a categorical value becomes numeric tree inputs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumTransform {
    /// `name_option` is 1.0 for the chosen option, 0.0 for the others
    #[default]
    OneHot,
    /// `name` takes the mapped value of the chosen option
    Mapped(BTreeMap<String, f64>),
}

/// Categorical parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumParameter {
    pub default: String,
    pub options: Vec<String>,
    /// Relative draw weights per option, uniform when absent
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
    /// Always yield the default when drawing
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub transform: EnumTransform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterKind {
    Float(FloatParameter),
    Enum(EnumParameter),
}

/// A named model parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(flatten)]
    pub kind: ParameterKind,
}

impl Parameter {
    pub fn float(name: impl Into<String>, default: f64, distribution: Distribution) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Float(FloatParameter { default, distribution }),
        }
    }

    /// Categorical parameter with uniform weights and one-hot transform
    pub fn categorical<I, S>(name: impl Into<String>, default: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: ParameterKind::Enum(EnumParameter {
                default: default.into(),
                options: options.into_iter().map(Into::into).collect(),
                weights: None,
                fixed: false,
                transform: EnumTransform::OneHot,
            }),
        }
    }

    /// Set draw weights of a categorical parameter; no-op for floats
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        if let ParameterKind::Enum(ref mut p) = self.kind {
            p.weights = Some(weights);
        }
        self
    }

    /// Map categorical options to a single numeric input; no-op for floats
    pub fn with_mapping<I, S>(mut self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        if let ParameterKind::Enum(ref mut p) = self.kind {
            p.transform = EnumTransform::Mapped(mapping.into_iter().map(|(k, v)| (k.into(), v)).collect());
        }
        self
    }

    /// Pin a categorical parameter to its default when drawing; no-op for floats
    pub fn fixed(mut self) -> Self {
        if let ParameterKind::Enum(ref mut p) = self.kind {
            p.fixed = true;
        }
        self
    }

    pub fn default_value(&self) -> RawValue {
        match &self.kind {
            ParameterKind::Float(p) => RawValue::Float(p.default),
            ParameterKind::Enum(p) => RawValue::Category(p.default.clone()),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> ImpactError {
        ImpactError::InvalidValue {
            parameter: self.name.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match &self.kind {
            ParameterKind::Float(p) => {
                if !p.default.is_finite() {
                    return Err(self.invalid("default is not finite"));
                }
                p.distribution.validate().map_err(|reason| self.invalid(reason))
            }
            ParameterKind::Enum(p) => {
                if p.options.is_empty() {
                    return Err(self.invalid("no options declared"));
                }
                let unique: BTreeSet<&String> = p.options.iter().collect();
                if unique.len() != p.options.len() {
                    return Err(self.invalid("options are not unique"));
                }
                if !p.options.contains(&p.default) {
                    return Err(self.invalid(format!("default {:?} is not an option", p.default)));
                }
                if let Some(weights) = &p.weights {
                    if weights.len() != p.options.len() {
                        return Err(self.invalid(format!(
                            "{} weights for {} options",
                            weights.len(),
                            p.options.len()
                        )));
                    }
                    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
                        return Err(self.invalid("weights must be non-negative with a positive sum"));
                    }
                }
                if let EnumTransform::Mapped(mapping) = &p.transform {
                    if let Some(missing) = p.options.iter().find(|o| !mapping.contains_key(*o)) {
                        return Err(self.invalid(format!("no mapping for option {missing:?}")));
                    }
                }
                Ok(())
            }
        }
    }

    /// Apply the transform to a value or batch.
    ///
    /// Pure and element-wise: batch position `i` of every output comes from
    /// position `i` of the input.
    pub fn transform(&self, value: &ParameterValue) -> Result<Vec<(String, Batched<f64>)>> {
        match &self.kind {
            ParameterKind::Float(_) => {
                let numeric = value.try_map(|raw| match raw {
                    RawValue::Float(v) if v.is_finite() => Ok(*v),
                    other => Err(self.invalid(format!("expected a finite number, got {other}"))),
                })?;
                Ok(vec![(self.name.clone(), numeric)])
            }
            ParameterKind::Enum(p) => {
                let chosen = value.try_map(|raw| match raw {
                    RawValue::Category(c) if p.options.contains(c) => Ok(c.clone()),
                    other => Err(self.invalid(format!("expected one of {:?}, got {other}", p.options))),
                })?;
                match &p.transform {
                    EnumTransform::OneHot => Ok(p
                        .options
                        .iter()
                        .map(|option| {
                            let flag = chosen.map(|c| if c == option { 1.0 } else { 0.0 });
                            (format!("{}_{}", self.name, option), flag)
                        })
                        .collect()),
                    EnumTransform::Mapped(mapping) => {
                        let mapped = chosen.map(|c| mapping.get(c).copied().unwrap_or(0.0));
                        Ok(vec![(self.name.clone(), mapped)])
                    }
                }
            }
        }
    }

    /// Names of the tree inputs produced by [`Parameter::transform`]
    pub fn output_names(&self) -> Vec<String> {
        match &self.kind {
            ParameterKind::Enum(p) if p.transform == EnumTransform::OneHot => p
                .options
                .iter()
                .map(|option| format!("{}_{}", self.name, option))
                .collect(),
            _ => vec![self.name.clone()],
        }
    }

    /// Map a uniform draw `u` in `[0, 1]` onto the declared distribution
    pub fn quantile(&self, u: f64) -> RawValue {
        match &self.kind {
            ParameterKind::Float(p) => RawValue::Float(p.distribution.quantile(p.default, u)),
            ParameterKind::Enum(p) => {
                if p.fixed || p.options.len() == 1 {
                    return RawValue::Category(p.default.clone());
                }
                let weights = p
                    .weights
                    .clone()
                    .unwrap_or_else(|| vec![1.0; p.options.len()]);
                let total: f64 = weights.iter().sum();
                let target = u.clamp(0.0, 1.0) * total;
                let mut cumulative = 0.0;
                for (option, weight) in p.options.iter().zip(&weights) {
                    cumulative += weight;
                    if target < cumulative {
                        return RawValue::Category(option.clone());
                    }
                }
                // u == 1.0 lands past the last interval
                let last = p
                    .options
                    .iter()
                    .zip(&weights)
                    .rev()
                    .find(|(_, w)| **w > 0.0)
                    .map(|(o, _)| o.clone())
                    .unwrap_or_else(|| p.default.clone());
                RawValue::Category(last)
            }
        }
    }
}

/// Ordered set of parameters with unique names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Parameter>", into = "Vec<Parameter>")]
pub struct ParameterCollection {
    parameters: Vec<Parameter>,
    index: BTreeMap<String, usize>,
}

impl TryFrom<Vec<Parameter>> for ParameterCollection {
    type Error = ImpactError;

    fn try_from(parameters: Vec<Parameter>) -> Result<Self> {
        Self::new(parameters)
    }
}

impl From<ParameterCollection> for Vec<Parameter> {
    fn from(collection: ParameterCollection) -> Self {
        collection.parameters
    }
}

impl ParameterCollection {
    pub fn new(parameters: Vec<Parameter>) -> Result<Self> {
        let mut index = BTreeMap::new();
        let mut outputs: BTreeMap<String, &str> = BTreeMap::new();
        for (position, parameter) in parameters.iter().enumerate() {
            parameter.validate()?;
            if index.insert(parameter.name.clone(), position).is_some() {
                return Err(ImpactError::DuplicateParameter(parameter.name.clone()));
            }
            for key in parameter.output_names() {
                if let Some(first) = outputs.insert(key.clone(), parameter.name.as_str()) {
                    return Err(ImpactError::TransformCollision {
                        key,
                        first: first.to_string(),
                        second: parameter.name.clone(),
                    });
                }
            }
        }
        Ok(Self { parameters, index })
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index.get(name).map(|&i| &self.parameters[i])
    }

    /// Parameter names in declaration order
    pub fn names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name.clone()).collect()
    }

    /// Fail on the first supplied name the collection does not declare
    pub fn check_known<I, S>(&self, supplied: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in supplied {
            if self.get(name.as_ref()).is_none() {
                return Err(ImpactError::UnknownParameter(name.as_ref().to_string()));
            }
        }
        Ok(())
    }

    /// Declared names absent from `supplied`, in declaration order
    pub fn missing<I, S>(&self, supplied: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let supplied: BTreeSet<String> = supplied.into_iter().map(|s| s.as_ref().to_string()).collect();
        self.parameters
            .iter()
            .filter(|p| !supplied.contains(&p.name))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Default values for exactly `names`
    pub fn defaults<S: AsRef<str>>(&self, names: &[S]) -> Result<Parameters> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let parameter = self
                    .get(name)
                    .ok_or_else(|| ImpactError::UnknownParameter(name.to_string()))?;
                Ok((name.to_string(), Batched::Scalar(parameter.default_value())))
            })
            .collect()
    }

    /// Sensitivity problem: every parameter on the unit interval, in
    /// declaration order (the order of the reported indices)
    pub fn sobol_problem(&self) -> Problem {
        Problem::unit(self.names())
    }

    /// `n` independent uniform draws in `[0, 1)` per parameter
    pub fn uniform_draw<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<SampleBatch<f64>> {
        if n == 0 {
            return Err(ImpactError::InvalidSampleCount(n));
        }
        let columns = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), (0..n).map(|_| rng.gen::<f64>()).collect()))
            .collect();
        debug!(samples = n, parameters = self.len(), "uniform draw");
        SampleBatch::new(DrawScheme::Uniform { samples: n }, columns)
    }

    /// Saltelli design of `n` base samples in `[0, 1)` per parameter
    pub fn sobol_draw<R: Rng + ?Sized>(
        &self,
        n: usize,
        second_order: bool,
        skip: Option<usize>,
        rng: &mut R,
    ) -> Result<SampleBatch<f64>> {
        if n == 0 {
            return Err(ImpactError::InvalidSampleCount(n));
        }
        let problem = self.sobol_problem();
        let design = saltelli_sample(&problem, n, second_order, skip, rng)?;
        let columns = problem
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), design.column(i)))
            .collect();
        debug!(
            base_samples = n,
            rows = design.rows.len(),
            parameters = self.len(),
            "Sobol draw"
        );
        SampleBatch::new(DrawScheme::Saltelli(design.layout), columns)
    }

    /// Map unit draws onto each parameter's distribution, keeping row order
    pub fn to_distribution(&self, samples: &SampleBatch<f64>) -> Result<SampleBatch<RawValue>> {
        samples.map_columns(|name, column| {
            let parameter = self
                .get(name)
                .ok_or_else(|| ImpactError::UnknownParameter(name.to_string()))?;
            Ok(column.iter().map(|&u| parameter.quantile(u)).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn collection() -> ParameterCollection {
        ParameterCollection::new(vec![
            Parameter::float("p1", 5.0, Distribution::Uniform { min: 0.0, max: 10.0 }),
            Parameter::categorical("p2", "a", ["a", "b"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_colliding_transform_outputs() {
        let err = ParameterCollection::new(vec![
            Parameter::float("c_x", 7.0, Distribution::Fixed),
            Parameter::categorical("c", "y", ["x", "y"]),
        ])
        .unwrap_err();
        match err {
            ImpactError::TransformCollision { key, first, second } => {
                assert_eq!(key, "c_x");
                assert_eq!(first, "c_x");
                assert_eq!(second, "c");
            }
            other => panic!("unexpected error {other:?}"),
        }

        // a mapped categorical emits only its own name
        let mapped = ParameterCollection::new(vec![
            Parameter::float("c_x", 7.0, Distribution::Fixed),
            Parameter::categorical("c", "y", ["x", "y"]).with_mapping([("x", 0.0), ("y", 1.0)]),
        ]);
        assert!(mapped.is_ok());
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = ParameterCollection::new(vec![
            Parameter::float("p", 1.0, Distribution::Fixed),
            Parameter::float("p", 2.0, Distribution::Fixed),
        ])
        .unwrap_err();
        assert!(matches!(err, ImpactError::DuplicateParameter(ref n) if n == "p"));
    }

    #[test]
    fn test_rejects_invalid_declarations() {
        let bad_default = Parameter::categorical("c", "z", ["a", "b"]);
        assert!(bad_default.validate().is_err());

        let bad_weights = Parameter::categorical("c", "a", ["a", "b"]).with_weights(vec![1.0]);
        assert!(bad_weights.validate().is_err());

        let bad_mapping = Parameter::categorical("c", "a", ["a", "b"]).with_mapping([("a", 1.0)]);
        assert!(bad_mapping.validate().is_err());

        let bad_range = Parameter::float("f", 0.0, Distribution::Uniform { min: 2.0, max: 1.0 });
        assert!(bad_range.validate().is_err());
    }

    #[test]
    fn test_missing_and_defaults() {
        let params = collection();
        let missing = params.missing(["p1"]);
        assert_eq!(missing, vec!["p2".to_string()]);

        let defaults = params.defaults(&missing).unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults["p2"], ParameterValue::from("a"));

        assert!(matches!(
            params.defaults(&["nope"]),
            Err(ImpactError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_float_transform_is_identity() {
        let p = Parameter::float("p1", 0.0, Distribution::Fixed);
        let out = p.transform(&ParameterValue::from(vec![1.0, 2.0])).unwrap();
        assert_eq!(out, vec![("p1".to_string(), Batched::Batch(vec![1.0, 2.0]))]);
        assert!(p.transform(&ParameterValue::from("x")).is_err());
    }

    #[test]
    fn test_enum_one_hot_transform() {
        let p = Parameter::categorical("mix", "fr", ["fr", "de"]);
        let out = p.transform(&ParameterValue::from(vec!["de", "fr", "de"])).unwrap();
        assert_eq!(
            out,
            vec![
                ("mix_fr".to_string(), Batched::Batch(vec![0.0, 1.0, 0.0])),
                ("mix_de".to_string(), Batched::Batch(vec![1.0, 0.0, 1.0])),
            ]
        );
        assert!(p.transform(&ParameterValue::from("us")).is_err());
    }

    #[test]
    fn test_enum_mapped_transform() {
        let p = Parameter::categorical("p2", "a", ["a", "b"]).with_mapping([("a", 1.0), ("b", 1.5)]);
        let out = p.transform(&ParameterValue::from("b")).unwrap();
        assert_eq!(out, vec![("p2".to_string(), Batched::Scalar(1.5))]);
    }

    #[test]
    fn test_distribution_quantiles() {
        let uniform = Distribution::Uniform { min: 0.0, max: 10.0 };
        assert_eq!(uniform.quantile(0.0, 0.25), 2.5);

        let triangle = Distribution::Triangle { min: 0.0, mode: 5.0, max: 10.0 };
        assert!((triangle.quantile(0.0, 0.5) - 5.0).abs() < 1e-12);
        assert_eq!(triangle.quantile(0.0, 0.0), 0.0);
        assert_eq!(triangle.quantile(0.0, 1.0), 10.0);

        let normal = Distribution::Normal { mean: 1.0, std: 2.0, min: Some(0.0), max: None };
        assert!((normal.quantile(0.0, 0.5) - 1.0).abs() < 1e-9);
        assert_eq!(normal.quantile(0.0, 0.0), 0.0);
        assert!(normal.quantile(0.0, 1.0).is_finite());

        assert_eq!(Distribution::Fixed.quantile(3.0, 0.9), 3.0);
    }

    #[test]
    fn test_categorical_quantile_respects_weights() {
        let p = Parameter::categorical("c", "a", ["a", "b", "c"]).with_weights(vec![1.0, 0.0, 3.0]);
        assert_eq!(p.quantile(0.1), RawValue::from("a"));
        assert_eq!(p.quantile(0.25), RawValue::from("c"));
        assert_eq!(p.quantile(1.0), RawValue::from("c"));

        let pinned = Parameter::categorical("c", "b", ["a", "b"]).fixed();
        assert_eq!(pinned.quantile(0.0), RawValue::from("b"));
    }

    #[test]
    fn test_uniform_draw_shape() {
        let params = collection();
        let mut rng = StdRng::seed_from_u64(1);
        let draw = params.uniform_draw(50, &mut rng).unwrap();
        assert_eq!(draw.len(), 50);
        for column in draw.columns().values() {
            assert_eq!(column.len(), 50);
            assert!(column.iter().all(|u| (0.0..=1.0).contains(u)));
        }
        assert!(matches!(
            params.uniform_draw(0, &mut rng),
            Err(ImpactError::InvalidSampleCount(0))
        ));
    }

    #[test]
    fn test_sobol_draw_shape() {
        let params = collection();
        let mut rng = StdRng::seed_from_u64(1);
        let draw = params.sobol_draw(16, true, None, &mut rng).unwrap();
        assert_eq!(draw.len(), 16 * (2 * 2 + 2));
        assert!(matches!(draw.scheme(), DrawScheme::Saltelli(layout) if layout.num_vars == 2));
    }

    #[test]
    fn test_to_distribution_maps_columns() {
        let params = collection();
        let mut rng = StdRng::seed_from_u64(1);
        let draw = params.uniform_draw(20, &mut rng).unwrap();
        let mapped = params.to_distribution(&draw).unwrap();
        assert_eq!(mapped.scheme(), draw.scheme());
        let p1 = mapped.column("p1").unwrap();
        assert!(p1.iter().all(|v| matches!(v, RawValue::Float(x) if (0.0..=10.0).contains(x))));
        let p2 = mapped.column("p2").unwrap();
        assert!(p2.iter().all(|v| v == &RawValue::from("a") || v == &RawValue::from("b")));
    }

    #[test]
    fn test_serde_round_trip_keeps_index() {
        let params = collection();
        let json = serde_json::to_string(&params).unwrap();
        let back: ParameterCollection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
        assert!(back.get("p2").is_some());
    }
}
