use knitgen::utils::validation::Validate;
use knitgen::{ConfigTables, PatternError, PatternWorkflow};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

#[test]
fn test_tables_file_with_env_substitution() -> anyhow::Result<()> {
    std::env::set_var("KNITGEN_IT_YARN_WEIGHT", "fingering");

    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[yarn]
weight = "${{KNITGEN_IT_YARN_WEIGHT}}"
fiber = "merino"
color = "slate"
"#
    )?;

    let tables = ConfigTables::from_file(file.path())?;
    tables.validate()?;
    assert_eq!(tables.yarn.weight, "fingering");

    let artifact = PatternWorkflow::new(Arc::new(tables)).generate("lace blanket")?;
    // 48 * 7.0 = 336, a multiple of 8, plus the border
    assert_eq!(artifact.stitch_result.cast_on_stitches, 344);
    assert!(artifact
        .validation
        .warnings()
        .iter()
        .any(|w| w.starts_with("Fingering weight yarn with intermediate patterns")));
    assert!(artifact.outputs.markdown.contains("merino yarn in slate"));
    Ok(())
}

#[test]
fn test_missing_file_is_an_io_error() {
    let err = ConfigTables::from_file("/no/such/knitgen-tables.toml").unwrap_err();
    assert!(matches!(err, PatternError::Io(_)));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_inverted_gauge_range_fails_validation() -> anyhow::Result<()> {
    let tables = ConfigTables::from_toml_str(
        r#"
[gauge_ranges.worsted]
min = 5.0
max = 3.5
"#,
    )?;

    let err = tables.validate().unwrap_err();
    assert!(matches!(err, PatternError::Config { ref field, .. } if field == "gauge_ranges.worsted"));
    Ok(())
}
