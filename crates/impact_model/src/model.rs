//! Impact model: parameters, an impact tree and the operations that
//! evaluate them.
//!
//! Point evaluation fills in defaults for undeclared parameters, transforms
//! and hands the result to the tree. Uncertainty and sensitivity runs draw
//! batches from the parameter distributions first and push the whole batch
//! through the same path.

use crate::batch::Parameters;
use crate::config::ImpactConfig;
use crate::errors::{ImpactError, Result};
use crate::parameters::ParameterCollection;
use crate::scores::{LCIAScores, NodeScores};
use crate::sensitivity::{SensitivityAnalyzer, SensitivityRecord};
use crate::transform::{self, TransformedParameters};
use crate::tree::ImpactTreeNode;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Parameterized impact model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactModel {
    pub parameters: ParameterCollection,
    #[serde(default)]
    pub tree: Option<ImpactTreeNode>,
    #[serde(default)]
    pub config: ImpactConfig,
}

impl ImpactModel {
    /// Model with no tree yet; evaluation fails until one is attached
    pub fn new(parameters: ParameterCollection) -> Self {
        Self {
            parameters,
            tree: None,
            config: ImpactConfig::default(),
        }
    }

    pub fn with_tree(mut self, tree: ImpactTreeNode) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn with_config(mut self, config: ImpactConfig) -> Self {
        self.config = config;
        self
    }

    pub fn tree(&self) -> Result<&ImpactTreeNode> {
        self.tree.as_ref().ok_or(ImpactError::MissingTree)
    }

    /// Name of the root node
    pub fn name(&self) -> Result<&str> {
        Ok(self.tree()?.name.as_str())
    }

    /// One model per child of the root, each with its own copy of the
    /// parameters and configuration
    pub fn from_tree_children(&self) -> Result<Vec<ImpactModel>> {
        let tree = self.tree()?;
        Ok(tree
            .children
            .iter()
            .map(|child| ImpactModel {
                parameters: self.parameters.clone(),
                tree: Some(child.clone()),
                config: self.config.clone(),
            })
            .collect())
    }

    pub fn transform_parameters(&self, parameters: &Parameters) -> Result<TransformedParameters> {
        transform::transform_parameters(&self.parameters, parameters)
    }

    /// Caller values completed with defaults for every undeclared parameter
    fn complete(&self, parameters: Parameters) -> Result<Parameters> {
        self.parameters.check_known(parameters.keys())?;
        let missing = self.parameters.missing(parameters.keys());
        let mut complete = self.parameters.defaults(&missing)?;
        debug!(supplied = parameters.len(), defaulted = missing.len(), "completing parameters");
        complete.extend(parameters);
        Ok(complete)
    }

    /// Scores of the whole tree
    pub fn evaluate(&self, parameters: Parameters) -> Result<LCIAScores> {
        let tree = self.tree()?;
        let transformed = self.transform_parameters(&self.complete(parameters)?)?;
        tree.compute(&transformed, false)
    }

    /// Scores of every node, root first.
    ///
    /// Every node reports every method used anywhere in the tree.
    /// Without `group_by` each node reports the total of its subtree. With
    /// it, nodes report only their own impacts and are pooled per value of
    /// that property, so pools never count a node twice.
    pub fn evaluate_per_node(&self, parameters: Parameters, group_by: Option<&str>) -> Result<Vec<NodeScores>> {
        let tree = self.tree()?;
        let transformed = self.transform_parameters(&self.complete(parameters)?)?;
        let direct = group_by.is_some();
        let methods = tree.methods();

        let nodes = tree
            .unnested_descendants()
            .into_iter()
            .map(|entry| {
                Ok(NodeScores {
                    name: entry.node.name.clone(),
                    properties: entry.node.properties.clone(),
                    parent: entry.parent.map(|p| p.name.clone()).unwrap_or_default(),
                    lcia_scores: entry.node.compute_methods(&transformed, direct, &methods)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(nodes = nodes.len(), direct, "evaluated per node");

        match group_by {
            Some(property) => NodeScores::combine_by_property(nodes, property),
            None => Ok(nodes),
        }
    }

    fn rng(&self) -> StdRng {
        match self.config.sampling.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn uniform_parameters(&self, n: usize) -> Result<Parameters> {
        let samples = self.parameters.uniform_draw(n, &mut self.rng())?;
        Ok(self.parameters.to_distribution(&samples)?.into_parameters())
    }

    /// Tree scores over `n` independent draws from the parameter distributions
    pub fn evaluate_uncertainty(&self, n: usize) -> Result<LCIAScores> {
        // fail before drawing
        let _tree = self.tree()?;
        info!(samples = n, "evaluating uncertainty");
        self.evaluate(self.uniform_parameters(n)?)
    }

    /// Per-node variant of [`ImpactModel::evaluate_uncertainty`]
    pub fn evaluate_uncertainty_per_node(&self, n: usize) -> Result<Vec<NodeScores>> {
        let _tree = self.tree()?;
        info!(samples = n, "evaluating uncertainty per node");
        self.evaluate_per_node(self.uniform_parameters(n)?, None)
    }

    /// First-order Sobol indices of every parameter for every impact method.
    ///
    /// `n` is the number of base samples of the Saltelli design. With
    /// `all_nodes` every node of the tree is analyzed on its subtree total,
    /// otherwise only the root.
    pub fn analyze_sensitivity(&self, n: usize, all_nodes: bool) -> Result<Vec<SensitivityRecord>> {
        let tree = self.tree()?;
        let sampling = &self.config.sampling;
        let sensitivity = &self.config.sensitivity;
        info!(
            base_samples = n,
            all_nodes,
            second_order = sensitivity.calc_second_order,
            "analyzing sensitivity"
        );

        let samples = self.parameters.sobol_draw(
            n,
            sensitivity.calc_second_order,
            sampling.skip_values,
            &mut self.rng(),
        )?;
        let scheme = samples.scheme();
        let values = self.parameters.to_distribution(&samples)?.into_parameters();

        let units: Vec<(String, LCIAScores)> = if all_nodes {
            self.evaluate_per_node(values, None)?
                .into_iter()
                .map(|node| (node.name, node.lcia_scores))
                .collect()
        } else {
            vec![(tree.name.clone(), self.evaluate(values)?)]
        };

        let analyzer = SensitivityAnalyzer::new(scheme, self.parameters.names(), sensitivity, sampling.seed)?;
        let records = analyzer.analyze(&units)?;
        info!(records = records.len(), "sensitivity analysis complete");
        Ok(records)
    }
}
