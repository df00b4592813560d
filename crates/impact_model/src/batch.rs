//! Scalar-or-batch values and typed sample batches.
//!
//! Every value flowing through the model is either a single value or a batch
//! of values where position `i` is the `i`-th Monte Carlo draw. Batches that
//! meet in one computation must share a length; scalars broadcast.

use crate::errors::{ImpactError, Result};
use lca_sobol::SaltelliLayout;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single value or an ordered batch of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Batched<T> {
    Scalar(T),
    Batch(Vec<T>),
}

impl<T> Batched<T> {
    /// Length of the batch, `None` for scalars
    pub fn batch_len(&self) -> Option<usize> {
        match self {
            Batched::Scalar(_) => None,
            Batched::Batch(values) => Some(values.len()),
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Batched::Batch(_))
    }

    /// Value at draw `index`; scalars answer for every index
    pub fn get(&self, index: usize) -> Option<&T> {
        match self {
            Batched::Scalar(value) => Some(value),
            Batched::Batch(values) => values.get(index),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Batched<U> {
        match self {
            Batched::Scalar(value) => Batched::Scalar(f(value)),
            Batched::Batch(values) => Batched::Batch(values.iter().map(f).collect()),
        }
    }

    pub fn try_map<U, E>(&self, mut f: impl FnMut(&T) -> std::result::Result<U, E>) -> std::result::Result<Batched<U>, E> {
        match self {
            Batched::Scalar(value) => Ok(Batched::Scalar(f(value)?)),
            Batched::Batch(values) => values.iter().map(f).collect::<std::result::Result<_, _>>().map(Batched::Batch),
        }
    }
}

impl<T: Clone> Batched<T> {
    /// Replicate a scalar into a batch of `len`; batches are returned as is
    pub fn broadcast(&self, len: usize) -> Batched<T> {
        match self {
            Batched::Scalar(value) => Batched::Batch(vec![value.clone(); len]),
            Batched::Batch(values) => Batched::Batch(values.clone()),
        }
    }
}

impl Batched<f64> {
    /// Element-wise combination with scalar broadcasting.
    ///
    /// Returns `None` when both sides are batches of different lengths.
    pub fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Option<Self> {
        match (self, other) {
            (Batched::Scalar(a), Batched::Scalar(b)) => Some(Batched::Scalar(f(*a, *b))),
            (Batched::Scalar(a), Batched::Batch(bs)) => {
                Some(Batched::Batch(bs.iter().map(|b| f(*a, *b)).collect()))
            }
            (Batched::Batch(a_values), Batched::Scalar(b)) => {
                Some(Batched::Batch(a_values.iter().map(|a| f(*a, *b)).collect()))
            }
            (Batched::Batch(a_values), Batched::Batch(b_values)) => {
                if a_values.len() != b_values.len() {
                    return None;
                }
                Some(Batched::Batch(
                    a_values.iter().zip(b_values).map(|(a, b)| f(*a, *b)).collect(),
                ))
            }
        }
    }

    /// Values as a vector, scalars broadcast to `len`
    pub fn to_vec(&self, len: usize) -> Vec<f64> {
        match self {
            Batched::Scalar(value) => vec![*value; len],
            Batched::Batch(values) => values.clone(),
        }
    }
}

/// Raw (untransformed) parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Float(f64),
    Category(String),
}

impl RawValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Float(value) => Some(*value),
            RawValue::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            RawValue::Float(_) => None,
            RawValue::Category(value) => Some(value),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Float(value) => write!(f, "{value}"),
            RawValue::Category(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Category(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Category(value)
    }
}

/// Caller-supplied parameter value: one raw value or a batch of them
pub type ParameterValue = Batched<RawValue>;

/// Parameter name to value(s)
pub type Parameters = BTreeMap<String, ParameterValue>;

impl From<RawValue> for ParameterValue {
    fn from(value: RawValue) -> Self {
        Batched::Scalar(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Batched::Scalar(RawValue::Float(value))
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Batched::Scalar(value.into())
    }
}

impl From<Vec<f64>> for ParameterValue {
    fn from(values: Vec<f64>) -> Self {
        Batched::Batch(values.into_iter().map(RawValue::Float).collect())
    }
}

impl From<Vec<&str>> for ParameterValue {
    fn from(values: Vec<&str>) -> Self {
        Batched::Batch(values.into_iter().map(RawValue::from).collect())
    }
}

/// How a sample batch was drawn; fixes its length and row semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawScheme {
    /// Independent uniform draws
    Uniform { samples: usize },
    /// Saltelli design; rows must stay in design order up to the analyzer
    Saltelli(SaltelliLayout),
}

impl DrawScheme {
    /// Number of rows every column carries
    pub fn len(&self) -> usize {
        match self {
            DrawScheme::Uniform { samples } => *samples,
            DrawScheme::Saltelli(layout) => layout.total_rows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Columns of draws, one per parameter, all aligned on the same rows
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBatch<T> {
    scheme: DrawScheme,
    columns: BTreeMap<String, Vec<T>>,
}

impl<T> SampleBatch<T> {
    pub(crate) fn new(scheme: DrawScheme, columns: BTreeMap<String, Vec<T>>) -> Result<Self> {
        let expected = scheme.len();
        let mismatched: Vec<(String, usize)> = columns
            .iter()
            .filter(|(_, column)| column.len() != expected)
            .map(|(name, column)| (name.clone(), column.len()))
            .collect();
        if !mismatched.is_empty() {
            return Err(ImpactError::BatchLengthMismatch(mismatched));
        }
        Ok(Self { scheme, columns })
    }

    pub fn scheme(&self) -> DrawScheme {
        self.scheme
    }

    /// Rows per column
    pub fn len(&self) -> usize {
        self.scheme.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheme.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[T]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn columns(&self) -> &BTreeMap<String, Vec<T>> {
        &self.columns
    }

    /// Transform every column, keeping the scheme and row order
    pub fn map_columns<U>(&self, mut f: impl FnMut(&str, &[T]) -> Result<Vec<U>>) -> Result<SampleBatch<U>> {
        let columns = self
            .columns
            .iter()
            .map(|(name, column)| Ok((name.clone(), f(name, column)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        SampleBatch::new(self.scheme, columns)
    }
}

impl SampleBatch<RawValue> {
    /// Hand the draws to the evaluator as batch-valued parameters
    pub fn into_parameters(self) -> Parameters {
        self.columns
            .into_iter()
            .map(|(name, column)| (name, Batched::Batch(column)))
            .collect()
    }
}
