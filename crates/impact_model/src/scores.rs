//! Impact score collections

use crate::batch::Batched;
use crate::errors::{ImpactError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Score per impact method, single or one per Monte Carlo draw
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LCIAScores {
    pub scores: BTreeMap<String, Batched<f64>>,
}

impl LCIAScores {
    pub fn new(scores: BTreeMap<String, Batched<f64>>) -> Self {
        Self { scores }
    }

    pub fn get(&self, method: &str) -> Option<&Batched<f64>> {
        self.scores.get(method)
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Batch length shared by the batched scores, `None` when all are scalar
    pub fn batch_len(&self) -> Option<usize> {
        self.scores.values().find_map(Batched::batch_len)
    }

    /// Method-wise sum; a method missing on one side counts as zero
    pub fn try_add(&self, other: &Self) -> Result<Self> {
        let mut scores = self.scores.clone();
        for (method, score) in &other.scores {
            let summed = match scores.get(method) {
                Some(existing) => existing.zip_with(score, |a, b| a + b).ok_or_else(|| {
                    ImpactError::BatchLengthMismatch(vec![
                        (method.clone(), existing.batch_len().unwrap_or(1)),
                        (method.clone(), score.batch_len().unwrap_or(1)),
                    ])
                })?,
                None => score.clone(),
            };
            scores.insert(method.clone(), summed);
        }
        Ok(Self { scores })
    }

    pub fn sum<'a>(items: impl IntoIterator<Item = &'a LCIAScores>) -> Result<Self> {
        items
            .into_iter()
            .try_fold(LCIAScores::default(), |acc, item| acc.try_add(item))
    }
}

impl FromIterator<(String, Batched<f64>)> for LCIAScores {
    fn from_iter<I: IntoIterator<Item = (String, Batched<f64>)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

/// Scores of one tree node (or of a pool of nodes sharing a property value)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeScores {
    pub name: String,
    pub properties: BTreeMap<String, String>,
    /// Parent node name, empty for the root
    pub parent: String,
    pub lcia_scores: LCIAScores,
}

impl NodeScores {
    /// Pool records sharing the same value of `property`.
    ///
    /// Scores are summed per method; pools appear in the order their value
    /// is first met. Records without the property are left out.
    pub fn combine_by_property(scores: Vec<NodeScores>, property: &str) -> Result<Vec<NodeScores>> {
        let mut pooled: Vec<NodeScores> = Vec::new();
        let mut positions: BTreeMap<String, usize> = BTreeMap::new();
        let mut skipped = 0usize;

        for node in scores {
            let Some(value) = node.properties.get(property).cloned() else {
                skipped += 1;
                continue;
            };
            match positions.get(&value) {
                Some(&i) => {
                    pooled[i].lcia_scores = pooled[i].lcia_scores.try_add(&node.lcia_scores)?;
                }
                None => {
                    positions.insert(value.clone(), pooled.len());
                    pooled.push(NodeScores {
                        name: value.clone(),
                        properties: BTreeMap::from([(property.to_string(), value)]),
                        parent: String::new(),
                        lcia_scores: node.lcia_scores,
                    });
                }
            }
        }

        debug!(property, pools = pooled.len(), skipped, "combined node scores by property");
        Ok(pooled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, Batched<f64>)]) -> LCIAScores {
        pairs.iter().map(|(m, s)| (m.to_string(), s.clone())).collect()
    }

    fn node(name: &str, phase: Option<&str>, gwp: f64) -> NodeScores {
        NodeScores {
            name: name.to_string(),
            properties: phase
                .map(|p| BTreeMap::from([("phase".to_string(), p.to_string())]))
                .unwrap_or_default(),
            parent: "root".to_string(),
            lcia_scores: scores(&[("gwp", Batched::Scalar(gwp))]),
        }
    }

    #[test]
    fn test_try_add_unions_methods() {
        let a = scores(&[("gwp", Batched::Scalar(1.0))]);
        let b = scores(&[("gwp", Batched::Batch(vec![1.0, 2.0])), ("water", Batched::Scalar(3.0))]);
        let sum = a.try_add(&b).unwrap();
        assert_eq!(sum.get("gwp"), Some(&Batched::Batch(vec![2.0, 3.0])));
        assert_eq!(sum.get("water"), Some(&Batched::Scalar(3.0)));
        assert_eq!(sum.batch_len(), Some(2));
    }

    #[test]
    fn test_try_add_rejects_mismatched_batches() {
        let a = scores(&[("gwp", Batched::Batch(vec![1.0, 2.0, 3.0]))]);
        let b = scores(&[("gwp", Batched::Batch(vec![1.0]))]);
        assert!(matches!(a.try_add(&b), Err(ImpactError::BatchLengthMismatch(_))));
    }

    #[test]
    fn test_combine_by_property_sums_pools() {
        let nodes = vec![
            node("a", Some("use"), 1.0),
            node("b", Some("manufacturing"), 2.0),
            node("c", Some("use"), 4.0),
            node("d", None, 8.0),
        ];
        let pooled = NodeScores::combine_by_property(nodes, "phase").unwrap();

        assert_eq!(pooled.len(), 2);
        assert_eq!(pooled[0].name, "use");
        assert_eq!(pooled[0].lcia_scores.get("gwp"), Some(&Batched::Scalar(5.0)));
        assert_eq!(pooled[0].parent, "");
        assert_eq!(pooled[0].properties["phase"], "use");
        assert_eq!(pooled[1].name, "manufacturing");
        assert_eq!(pooled[1].lcia_scores.get("gwp"), Some(&Batched::Scalar(2.0)));
    }
}
