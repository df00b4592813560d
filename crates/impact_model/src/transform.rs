//! Parameter transform engine.
//!
//! Turns caller values (scalars and equal-length batches, mixed freely) into
//! the flat set of transformed numeric inputs the impact tree consumes. When
//! any batch is present every scalar is broadcast to the common length, so
//! position `i` of every transformed input belongs to draw `i`.

use crate::batch::{Batched, Parameters};
use crate::errors::{ImpactError, Result};
use crate::parameters::ParameterCollection;
use std::collections::BTreeMap;
use tracing::debug;

/// Transformed input name to value(s)
pub type TransformedParameters = BTreeMap<String, Batched<f64>>;

/// Common length of the batch-valued entries, `None` when all are scalar
pub fn common_batch_len(parameters: &Parameters) -> Result<Option<usize>> {
    let lengths: Vec<(String, usize)> = parameters
        .iter()
        .filter_map(|(name, value)| value.batch_len().map(|len| (name.clone(), len)))
        .collect();

    let Some(&(_, first)) = lengths.first() else {
        return Ok(None);
    };
    if lengths.iter().any(|(_, len)| *len != first) {
        return Err(ImpactError::BatchLengthMismatch(lengths));
    }
    Ok(Some(first))
}

/// Transform every supplied parameter and merge the outputs.
///
/// Outputs are merged in input iteration order, a later key overwriting an
/// earlier one. Unknown names and mismatched batch lengths fail before any
/// transform runs.
pub fn transform_parameters(
    collection: &ParameterCollection,
    parameters: &Parameters,
) -> Result<TransformedParameters> {
    collection.check_known(parameters.keys())?;
    let batch_len = common_batch_len(parameters)?;

    let mut transformed = TransformedParameters::new();
    for (name, value) in parameters {
        let parameter = collection
            .get(name)
            .ok_or_else(|| ImpactError::UnknownParameter(name.clone()))?;
        let outputs = match batch_len {
            Some(len) => parameter.transform(&value.broadcast(len))?,
            None => parameter.transform(value)?,
        };
        transformed.extend(outputs);
    }

    debug!(
        inputs = parameters.len(),
        outputs = transformed.len(),
        batch_len = ?batch_len,
        "transformed parameters"
    );
    Ok(transformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ParameterValue;
    use crate::parameters::{Distribution, Parameter};

    fn collection() -> ParameterCollection {
        ParameterCollection::new(vec![
            Parameter::float("a", 1.0, Distribution::Fixed),
            Parameter::float("b", 2.0, Distribution::Fixed),
            Parameter::categorical("c", "x", ["x", "y"]),
        ])
        .unwrap()
    }

    fn params(entries: Vec<(&str, ParameterValue)>) -> Parameters {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_scalar_inputs_stay_scalar() {
        let out = transform_parameters(
            &collection(),
            &params(vec![("a", 3.0.into()), ("c", "y".into())]),
        )
        .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out["a"], Batched::Scalar(3.0));
        assert_eq!(out["c_x"], Batched::Scalar(0.0));
        assert_eq!(out["c_y"], Batched::Scalar(1.0));
    }

    #[test]
    fn test_scalars_broadcast_alongside_batches() {
        let out = transform_parameters(
            &collection(),
            &params(vec![
                ("a", vec![1.0, 2.0, 3.0].into()),
                ("b", 5.0.into()),
                ("c", "x".into()),
            ]),
        )
        .unwrap();
        assert_eq!(out["b"], Batched::Batch(vec![5.0; 3]));
        assert_eq!(out["c_x"], Batched::Batch(vec![1.0; 3]));
        assert!(out.values().all(|v| v.batch_len() == Some(3)));
    }

    #[test]
    fn test_rejects_unequal_batches() {
        let err = transform_parameters(
            &collection(),
            &params(vec![("a", vec![1.0, 2.0, 3.0].into()), ("b", vec![1.0, 2.0].into())]),
        )
        .unwrap_err();
        match err {
            ImpactError::BatchLengthMismatch(lengths) => {
                assert_eq!(lengths, vec![("a".to_string(), 3), ("b".to_string(), 2)]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_parameter() {
        let err = transform_parameters(&collection(), &params(vec![("zzz", 1.0.into())])).unwrap_err();
        assert!(matches!(err, ImpactError::UnknownParameter(ref n) if n == "zzz"));
    }

    #[test]
    fn test_batch_of_one_broadcasts_scalars() {
        let out = transform_parameters(
            &collection(),
            &params(vec![("a", vec![4.0].into()), ("b", 1.0.into())]),
        )
        .unwrap();
        assert_eq!(out["b"], Batched::Batch(vec![1.0]));
    }
}
