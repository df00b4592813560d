//! Configuration files and environment overrides driving a model run

use anyhow::Result;
use lca_impact_model::{
    init_logging, Distribution, ImpactConfig, ImpactError, ImpactExpr, ImpactModel, ImpactTreeNode, Parameter,
    ParameterCollection,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn test_loaded_config_drives_sensitivity() -> Result<()> {
    let file = write_config(
        r#"
        [sampling]
        seed = 17
        skip_values = 0

        [sensitivity]
        calc_second_order = false
        num_resamples = 25
        parallel = false

        [logging]
        level = "debug"
        format = "pretty"
        "#,
    )?;
    let config = ImpactConfig::load_from_file(file.path())?;
    assert_eq!(config.sampling.seed, Some(17));
    assert!(!config.sensitivity.calc_second_order);
    init_logging(&config.logging)?;

    let parameters = ParameterCollection::new(vec![
        Parameter::float("x", 0.0, Distribution::Normal { mean: 0.0, std: 1.0, min: None, max: None }),
        Parameter::float("y", 1.0, Distribution::Triangle { min: 0.0, mode: 1.0, max: 2.0 }),
    ])?;
    let tree = ImpactTreeNode::new("root").with_impact(
        "gwp",
        ImpactExpr::Sum(vec![
            ImpactExpr::param("x"),
            ImpactExpr::Product(vec![ImpactExpr::constant(0.1), ImpactExpr::param("y")]),
        ]),
    );
    let model = ImpactModel::new(parameters).with_tree(tree).with_config(config);

    let records = model.analyze_sensitivity(128, false)?;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.sobol_s1.is_finite() && r.sobol_s1_conf >= 0.0));
    assert!(records[0].sobol_s1 > records[1].sobol_s1);
    Ok(())
}

#[test]
fn test_missing_file_is_io_error() {
    let err = ImpactConfig::load_from_file("/nonexistent/lca-impact.toml").unwrap_err();
    assert!(matches!(err, ImpactError::Io(_)));
}

#[test]
fn test_env_overrides() -> Result<()> {
    let file = write_config("[sampling]\nseed = 1\n")?;
    let mut config = ImpactConfig::load_from_file(file.path())?;

    std::env::set_var("LCA_IMPACT_SEED", "99");
    std::env::set_var("LCA_IMPACT_PARALLEL", "false");
    let applied = config.apply_env_overrides();
    std::env::remove_var("LCA_IMPACT_SEED");
    std::env::remove_var("LCA_IMPACT_PARALLEL");
    applied?;

    assert_eq!(config.sampling.seed, Some(99));
    assert!(!config.sensitivity.parallel);

    std::env::set_var("LCA_IMPACT_CONF_LEVEL", "high");
    let rejected = config.apply_env_overrides();
    std::env::remove_var("LCA_IMPACT_CONF_LEVEL");
    assert!(matches!(rejected, Err(ImpactError::Config(_))));
    Ok(())
}
