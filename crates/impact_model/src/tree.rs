//! Impact tree: nodes carrying per-method impact expressions.
//!
//! A node's direct impacts are its own expressions; its total impacts add
//! the totals of all children. Every node reports every method found in its
//! subtree, with zero where it has no term of its own.

use crate::batch::Batched;
use crate::errors::{ImpactError, Result};
use crate::scores::LCIAScores;
use crate::transform::TransformedParameters;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Arithmetic over transformed parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactExpr {
    Constant(f64),
    Parameter(String),
    Sum(Vec<ImpactExpr>),
    Product(Vec<ImpactExpr>),
}

impl ImpactExpr {
    pub fn constant(value: f64) -> Self {
        ImpactExpr::Constant(value)
    }

    pub fn param(name: impl Into<String>) -> Self {
        ImpactExpr::Parameter(name.into())
    }

    pub fn evaluate(&self, params: &TransformedParameters) -> std::result::Result<Batched<f64>, String> {
        match self {
            ImpactExpr::Constant(value) => Ok(Batched::Scalar(*value)),
            ImpactExpr::Parameter(name) => params
                .get(name)
                .cloned()
                .ok_or_else(|| format!("parameter {name} is not defined")),
            ImpactExpr::Sum(terms) => fold(terms, params, 0.0, |a, b| a + b),
            ImpactExpr::Product(factors) => fold(factors, params, 1.0, |a, b| a * b),
        }
    }
}

fn fold(
    terms: &[ImpactExpr],
    params: &TransformedParameters,
    identity: f64,
    op: fn(f64, f64) -> f64,
) -> std::result::Result<Batched<f64>, String> {
    terms.iter().try_fold(Batched::Scalar(identity), |acc, term| {
        let value = term.evaluate(params)?;
        acc.zip_with(&value, op)
            .ok_or_else(|| "operands have different batch lengths".to_string())
    })
}

/// Node of the impact tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactTreeNode {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Impact method to this node's own contribution
    #[serde(default)]
    pub direct_impacts: BTreeMap<String, ImpactExpr>,
    #[serde(default)]
    pub children: Vec<ImpactTreeNode>,
}

/// A node seen during flattening, with its parent
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub node: &'a ImpactTreeNode,
    pub parent: Option<&'a ImpactTreeNode>,
}

impl ImpactTreeNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            direct_impacts: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_impact(mut self, method: impl Into<String>, expr: ImpactExpr) -> Self {
        self.direct_impacts.insert(method.into(), expr);
        self
    }

    pub fn with_child(mut self, child: ImpactTreeNode) -> Self {
        self.children.push(child);
        self
    }

    /// Impact methods used anywhere in this subtree
    pub fn methods(&self) -> BTreeSet<String> {
        let mut methods: BTreeSet<String> = self.direct_impacts.keys().cloned().collect();
        for child in &self.children {
            methods.extend(child.methods());
        }
        methods
    }

    /// Pre-order flattening of the subtree, this node first
    pub fn unnested_descendants(&self) -> Vec<NodeRef<'_>> {
        let mut nodes = Vec::new();
        self.collect_nodes(None, &mut nodes);
        nodes
    }

    fn collect_nodes<'a>(&'a self, parent: Option<&'a ImpactTreeNode>, out: &mut Vec<NodeRef<'a>>) {
        out.push(NodeRef { node: self, parent });
        for child in &self.children {
            child.collect_nodes(Some(self), out);
        }
    }

    /// Scores of this node for every method of its subtree.
    ///
    /// With `direct_impacts` only the node's own terms count; otherwise the
    /// whole subtree does. Scores are broadcast to the batch length of
    /// `params` when it carries batches.
    pub fn compute(&self, params: &TransformedParameters, direct_impacts: bool) -> Result<LCIAScores> {
        self.compute_methods(params, direct_impacts, &self.methods())
    }

    /// Scores of this node for exactly `methods`, zero where neither the
    /// node nor its subtree has a term
    pub fn compute_methods(
        &self,
        params: &TransformedParameters,
        direct_impacts: bool,
        methods: &BTreeSet<String>,
    ) -> Result<LCIAScores> {
        let mut scores = if direct_impacts {
            self.direct(params, methods)?
        } else {
            self.totals(params, methods)?
        };

        if let Some(len) = params.values().find_map(Batched::batch_len) {
            for score in scores.values_mut() {
                if !score.is_batch() {
                    *score = score.broadcast(len);
                }
            }
        }
        Ok(LCIAScores::new(scores))
    }

    fn direct(
        &self,
        params: &TransformedParameters,
        methods: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Batched<f64>>> {
        methods
            .iter()
            .map(|method| {
                let score = match self.direct_impacts.get(method) {
                    Some(expr) => expr.evaluate(params).map_err(|reason| ImpactError::Compute {
                        node: self.name.clone(),
                        reason: format!("{method}: {reason}"),
                    })?,
                    None => Batched::Scalar(0.0),
                };
                Ok((method.clone(), score))
            })
            .collect()
    }

    fn totals(
        &self,
        params: &TransformedParameters,
        methods: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Batched<f64>>> {
        let mut totals = self.direct(params, methods)?;
        for child in &self.children {
            let child_totals = child.totals(params, methods)?;
            for (method, value) in child_totals {
                let entry = totals.entry(method.clone()).or_insert(Batched::Scalar(0.0));
                *entry = entry.zip_with(&value, |a, b| a + b).ok_or_else(|| ImpactError::Compute {
                    node: child.name.clone(),
                    reason: format!("{method}: batch length differs from parent"),
                })?;
            }
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ImpactTreeNode {
        ImpactTreeNode::new("bike")
            .with_impact("gwp", ImpactExpr::constant(1.0))
            .with_child(
                ImpactTreeNode::new("frame")
                    .with_property("phase", "manufacturing")
                    .with_impact(
                        "gwp",
                        ImpactExpr::Product(vec![ImpactExpr::param("mass"), ImpactExpr::constant(2.0)]),
                    ),
            )
            .with_child(
                ImpactTreeNode::new("use")
                    .with_property("phase", "use")
                    .with_impact("water", ImpactExpr::param("km")),
            )
    }

    fn params(entries: &[(&str, Batched<f64>)]) -> TransformedParameters {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_total_scores_include_children() {
        let p = params(&[("mass", Batched::Scalar(3.0)), ("km", Batched::Scalar(10.0))]);
        let scores = tree().compute(&p, false).unwrap();
        assert_eq!(scores.get("gwp"), Some(&Batched::Scalar(7.0)));
        assert_eq!(scores.get("water"), Some(&Batched::Scalar(10.0)));
    }

    #[test]
    fn test_direct_scores_are_node_local() {
        let p = params(&[("mass", Batched::Scalar(3.0)), ("km", Batched::Scalar(10.0))]);
        let scores = tree().compute(&p, true).unwrap();
        assert_eq!(scores.get("gwp"), Some(&Batched::Scalar(1.0)));
        assert_eq!(scores.get("water"), Some(&Batched::Scalar(0.0)));
    }

    #[test]
    fn test_scores_broadcast_to_batch_length() {
        let p = params(&[("mass", Batched::Batch(vec![1.0, 2.0])), ("km", Batched::Batch(vec![0.0, 0.0]))]);
        let root = tree();
        let scores = root.compute(&p, true).unwrap();
        assert_eq!(scores.get("gwp"), Some(&Batched::Batch(vec![1.0, 1.0])));
        let scores = root.compute(&p, false).unwrap();
        assert_eq!(scores.get("gwp"), Some(&Batched::Batch(vec![3.0, 5.0])));
    }

    #[test]
    fn test_compute_methods_zero_fills_absent_methods() {
        let p = params(&[("mass", Batched::Scalar(3.0)), ("km", Batched::Scalar(10.0))]);
        let root = tree();
        let frame = &root.children[0];
        assert_eq!(frame.compute(&p, false).unwrap().len(), 1);

        let scores = frame.compute_methods(&p, false, &root.methods()).unwrap();
        assert_eq!(scores.get("gwp"), Some(&Batched::Scalar(6.0)));
        assert_eq!(scores.get("water"), Some(&Batched::Scalar(0.0)));
    }

    #[test]
    fn test_missing_parameter_is_compute_error() {
        let p = params(&[("km", Batched::Scalar(1.0))]);
        let err = tree().compute(&p, false).unwrap_err();
        assert!(matches!(err, ImpactError::Compute { ref node, .. } if node == "frame"));
    }

    #[test]
    fn test_unnested_descendants_records_parents() {
        let root = tree();
        let nodes = root.unnested_descendants();
        let names: Vec<&str> = nodes.iter().map(|n| n.node.name.as_str()).collect();
        assert_eq!(names, vec!["bike", "frame", "use"]);
        assert!(nodes[0].parent.is_none());
        assert_eq!(nodes[1].parent.map(|p| p.name.as_str()), Some("bike"));
    }

    #[test]
    fn test_deserializes_from_json() {
        let json = r#"{
            "name": "root",
            "direct_impacts": {"gwp": {"product": [{"parameter": "p1"}, {"constant": 2.0}]}},
            "children": [{"name": "leaf", "properties": {"phase": "use"}}]
        }"#;
        let node: ImpactTreeNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.children[0].properties["phase"], "use");
        let scores = node
            .compute(&params(&[("p1", Batched::Scalar(4.0))]), false)
            .unwrap();
        assert_eq!(scores.get("gwp"), Some(&Batched::Scalar(8.0)));
    }
}
