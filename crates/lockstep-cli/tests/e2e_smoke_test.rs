use std::{fs, path::PathBuf};

use tempfile::tempdir;

use lockstep_cli::Args;

/// Collects all .toml change logs from a directory
fn collect_change_logs(dir: PathBuf) -> Vec<PathBuf> {
    let mut files = if let Ok(entries) = fs::read_dir(&dir) {
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("toml")
            })
            .collect()
    } else {
        Vec::new()
    };

    files.sort();
    files
}

#[test]
fn e2e_smoke_test_demo_change_logs() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "").expect("Failed to write config");

    let demos = collect_change_logs(PathBuf::from("demos"));
    assert!(!demos.is_empty(), "No change logs found in demos/");

    let mut failed = Vec::new();

    for demo in &demos {
        let stem = demo.file_stem().unwrap().to_string_lossy().to_string();
        let model = temp_dir.path().join(format!("{stem}.model.toml"));
        let notation = temp_dir.path().join(format!("{stem}.notation.toml"));

        let args = Args {
            input: demo.to_string_lossy().to_string(),
            model: model.to_string_lossy().to_string(),
            notation: notation.to_string_lossy().to_string(),
            journal: None,
            config: Some(config_path.to_string_lossy().to_string()),
            log_level: "off".to_string(),
        };

        match lockstep_cli::run(&args) {
            Ok(report) => {
                assert_eq!(report.rejected(), 0, "{} had rejected changes", demo.display());
                assert!(model.exists(), "{} wrote no model", demo.display());
                assert!(notation.exists(), "{} wrote no notation", demo.display());
            }
            Err(e) => failed.push((demo.clone(), e)),
        }
    }

    if !failed.is_empty() {
        eprintln!("\nDemo change logs that failed:");
        for (path, error) in &failed {
            eprintln!("  {}: {error}", path.display());
        }
        panic!("{} of {} demo change logs failed", failed.len(), demos.len());
    }
}
