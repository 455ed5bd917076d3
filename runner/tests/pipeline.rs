use assert_cmd::Command;
use erpcore::report::{Product, ProductItem};
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn erp_runner() -> Command {
    Command::cargo_bin("erp-runner").unwrap()
}

/// Epochs with two channels and three samples; each trial is filled with its event code.
fn write_epochs(dir: &Path, event_id: serde_json::Value, events: &[i64]) -> std::path::PathBuf {
    let data: Vec<_> = events
        .iter()
        .map(|&code| vec![vec![code as f64, 0.0, -(code as f64)], vec![0.5, 1.0, 0.5]])
        .collect();
    let path = dir.join("meg-epo.json");
    fs::write(
        &path,
        json!({
            "sfreq": 200.0,
            "tmin": -0.005,
            "ch_names": ["MEG 0111", "MEG 0121"],
            "event_id": event_id,
            "events": events,
            "data": data,
        })
        .to_string(),
    )
    .unwrap();
    path
}

fn write_config(dir: &Path, epo: &Path) -> std::path::PathBuf {
    let path = dir.join("config.json");
    fs::write(
        &path,
        json!({"epo": epo, "dpi_file": 30, "dpi_inline": 15}).to_string(),
    )
    .unwrap();
    path
}

fn run(dir: &TempDir, config: &Path) -> assert_cmd::assert::Assert {
    erp_runner()
        .current_dir(dir.path())
        .arg("--config")
        .arg(config)
        .arg("--output-root")
        .arg(dir.path())
        .assert()
}

fn read_product(dir: &Path) -> Product {
    serde_json::from_str(&fs::read_to_string(dir.join("product.json")).unwrap()).unwrap()
}

fn info_texts(product: &Product) -> Vec<&str> {
    product
        .items
        .iter()
        .filter_map(|item| match item {
            ProductItem::Info { text } => Some(text.as_str()),
            ProductItem::Image { .. } => None,
        })
        .collect()
}

#[test]
fn test_help_flag() {
    erp_runner()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--synthesize"));
}

#[test]
fn test_empty_condition_is_skipped() {
    let dir = TempDir::new().unwrap();
    let epo = write_epochs(dir.path(), json!({"A": 1, "B": 2}), &[1; 10]);
    let config = write_config(dir.path(), &epo);

    run(&dir, &config)
        .success()
        .stdout(predicate::str::contains("Total epochs: 10"))
        .stdout(predicate::str::contains("HTML report saved"));

    assert!(dir.path().join("out_figs/erp_A.png").is_file());
    assert!(!dir.path().join("out_figs/erp_B.png").exists());
    assert!(dir.path().join("out_dir").is_dir());

    let html = fs::read_to_string(dir.path().join("out_report/report.html")).unwrap();
    assert_eq!(html.matches("<section").count(), 1);

    let product = read_product(dir.path());
    assert_eq!(product.image_filenames(), vec!["erp_A.png"]);
    assert_eq!(
        info_texts(&product),
        vec![
            "Processed 10 epochs",
            "Conditions: A",
            "Channels: 2",
            "Sampling rate: 200.0 Hz",
        ]
    );
}

#[test]
fn test_conditions_ordered_by_identifier() {
    let dir = TempDir::new().unwrap();
    let epo = write_epochs(
        dir.path(),
        json!({"first-key": 30, "second-key": 10, "third-key": 20}),
        &[30, 20, 10, 10],
    );
    let config = write_config(dir.path(), &epo);

    run(&dir, &config).success();

    let product = read_product(dir.path());
    assert_eq!(
        product.image_filenames(),
        vec!["erp_second-key.png", "erp_third-key.png", "erp_first-key.png"]
    );
    assert!(info_texts(&product).contains(&"Conditions: second-key, third-key, first-key"));

    let html = fs::read_to_string(dir.path().join("out_report/report.html")).unwrap();
    let positions: Vec<usize> = ["second-key", "third-key", "first-key"]
        .iter()
        .map(|name| html.find(&format!("<h2>{}</h2>", name)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn test_zero_epochs_writes_manifest_only() {
    let dir = TempDir::new().unwrap();
    let epo = write_epochs(dir.path(), json!({"A": 1, "B": 2}), &[]);
    let config = write_config(dir.path(), &epo);

    run(&dir, &config).success();

    assert!(!dir.path().join("out_report/report.html").exists());
    assert_eq!(fs::read_dir(dir.path().join("out_figs")).unwrap().count(), 0);
    let product = read_product(dir.path());
    assert!(product.image_filenames().is_empty());
    assert!(info_texts(&product).contains(&"Processed 0 epochs"));
}

#[test]
fn test_condition_names_become_safe_file_names() {
    let dir = TempDir::new().unwrap();
    let epo = write_epochs(
        dir.path(),
        json!({"Face/Happy": 1, "left cue": 2}),
        &[1, 2, 2],
    );
    let config = write_config(dir.path(), &epo);

    run(&dir, &config).success();

    assert!(dir.path().join("out_figs/erp_Face_Happy.png").is_file());
    assert!(dir.path().join("out_figs/erp_left_cue.png").is_file());
    assert_eq!(
        read_product(dir.path()).image_filenames(),
        vec!["erp_Face_Happy.png", "erp_left_cue.png"]
    );
}

#[test]
fn test_missing_epo_field_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, "{}").unwrap();

    run(&dir, &config)
        .failure()
        .stderr(predicate::str::contains("missing required field 'epo'"));
    assert!(!dir.path().join("product.json").exists());
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    run(&dir, &dir.path().join("absent.json"))
        .failure()
        .stderr(predicate::str::contains("reading job config"));
}

#[test]
fn test_malformed_epochs_file_fails() {
    let dir = TempDir::new().unwrap();
    let epo = dir.path().join("broken-epo.json");
    fs::write(&epo, "{\"sfreq\": 100.0, \"events\": [1]").unwrap();
    let config = write_config(dir.path(), &epo);

    run(&dir, &config)
        .failure()
        .stderr(predicate::str::contains("loading epochs"));
    assert!(!dir.path().join("product.json").exists());
    assert!(!dir.path().join("out_figs").exists());
}

#[test]
fn test_synthesized_epochs_run_end_to_end() {
    let dir = TempDir::new().unwrap();
    let epo = dir.path().join("synthetic-epo.json");

    erp_runner()
        .arg("--synthesize")
        .arg(&epo)
        .arg("--seed")
        .arg("7")
        .assert()
        .success()
        .stdout(predicate::str::contains("Synthetic epochs written"));

    let config = write_config(dir.path(), &epo);
    run(&dir, &config)
        .success()
        .stdout(predicate::str::contains("Total epochs: 100"));

    let figures = fs::read_dir(dir.path().join("out_figs")).unwrap().count();
    assert_eq!(figures, 4);
    assert!(dir.path().join("out_figs/erp_auditory_left.png").is_file());
    assert!(!dir.path().join("out_figs/erp_catch_trial.png").exists());
    assert_eq!(read_product(dir.path()).image_filenames().len(), 4);
}
