//! ---
//! wtp_section: "15-testing-qa-runbook"
//! wtp_subsection: "integration-tests"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Validation of shipped configuration and scenario files."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use wtp_common::config::AppConfig;
use wtp_scenario::ScenarioDefinition;

fn root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

fn read(path: &str) -> String {
    let full = root().join(path);
    fs::read_to_string(&full)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", full.display(), err))
}

#[test]
fn default_config_parses_and_validates() {
    let config: AppConfig = read("configs/wtp.toml").parse().unwrap();
    assert_eq!(config.alarms.thresholds.len(), 11);
    assert_eq!(
        config.alarms.thresholds,
        AppConfig::default().alarms.thresholds,
        "shipped thresholds should match the built-in defaults"
    );
    for path in &config.simulation.scenario_files {
        assert!(
            root().join(path).is_file(),
            "scenario file {} referenced by configs/wtp.toml is missing",
            path.display()
        );
    }
}

#[test]
fn shipped_files_carry_frontmatter() {
    let mut files = vec![root().join("configs/wtp.toml")];
    for entry in fs::read_dir(root().join("configs/scenarios")).unwrap() {
        files.push(entry.unwrap().path());
    }
    for file in files {
        let content = fs::read_to_string(&file).unwrap();
        assert!(
            content.starts_with("# ---"),
            "{} must include frontmatter header",
            file.display()
        );
    }
}

#[test]
fn shipped_scenarios_load() {
    for entry in fs::read_dir(root().join("configs/scenarios")).unwrap() {
        let path = entry.unwrap().path();
        let scenario = ScenarioDefinition::from_file(&path)
            .unwrap_or_else(|err| panic!("{}: {}", path.display(), err));
        assert!(!scenario.steps.is_empty(), "{} has no steps", scenario.id);
        assert!(
            !scenario.completion.is_empty(),
            "{} has no completion conditions",
            scenario.id
        );
    }
}
