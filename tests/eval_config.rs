use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use railwatch::config::EvalConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "RAILWATCH_CONFIG",
        "RAILWATCH_THRESHOLD",
        "RAILWATCH_TARGET_LABEL",
        "RAILWATCH_BACKEND",
        "RAILWATCH_MODEL_PATH",
        "RAILWATCH_REPLAY_PATH",
        "RAILWATCH_FPS_INTERVAL",
        "RAILWATCH_NUM_TRAINS",
        "RAILWATCH_TOLERANCE_SECS",
        "RAILWATCH_RESULTS_DIR",
        "RAILWATCH_GROUND_TRUTH",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = EvalConfig::load().expect("load config");
    assert_eq!(cfg.detection.threshold, 0.8);
    assert_eq!(cfg.detection.target_label, "train");
    assert_eq!(cfg.detection.backend, "stub");
    assert_eq!(cfg.sampling.fps_interval, 1.0);
    assert_eq!(cfg.schedule.num_trains, 5);
    assert_eq!(cfg.schedule.tolerance_secs, 15.0);
    assert_eq!(cfg.stability.max_history, 5);
    assert_eq!(cfg.stability.max_fade, 10);
    assert_eq!(cfg.results_dir, PathBuf::from("results"));
    assert!(cfg.ground_truth_path.is_none());
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "detection": {
            "threshold": 0.6,
            "target_label": "Train",
            "backend": "replay",
            "replay_path": "fixtures/replay.json"
        },
        "sampling": { "fps_interval": 0.5 },
        "schedule": { "num_trains": 8, "tolerance_secs": 20 },
        "stability": { "stability_threshold": 3 },
        "output": { "results_dir": "out/eval" },
        "ground_truth_path": "fixtures/gt.json"
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("RAILWATCH_CONFIG", file.path());
    std::env::set_var("RAILWATCH_NUM_TRAINS", "3");
    std::env::set_var("RAILWATCH_RESULTS_DIR", "/tmp/railwatch");

    let cfg = EvalConfig::load().expect("load config");

    assert_eq!(cfg.detection.threshold, 0.6);
    assert_eq!(cfg.detection.target_label, "Train");
    assert_eq!(cfg.detection.backend, "replay");
    assert_eq!(
        cfg.detection.replay_path,
        Some(PathBuf::from("fixtures/replay.json"))
    );
    assert_eq!(cfg.sampling.fps_interval, 0.5);
    assert_eq!(cfg.schedule.num_trains, 3);
    assert_eq!(cfg.schedule.tolerance_secs, 20.0);
    assert_eq!(cfg.stability.stability_threshold, 3);
    assert_eq!(cfg.stability.lock_threshold, 0.8);
    assert_eq!(cfg.results_dir, PathBuf::from("/tmp/railwatch"));
    assert_eq!(cfg.ground_truth_path, Some(PathBuf::from("fixtures/gt.json")));

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        [detection]
        threshold = 0.7
        backend = "STUB"

        [schedule]
        num_trains = 2
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("RAILWATCH_CONFIG", file.path());

    let cfg = EvalConfig::load().expect("load config");
    assert_eq!(cfg.detection.threshold, 0.7);
    assert_eq!(cfg.detection.backend, "stub");
    assert_eq!(cfg.schedule.num_trains, 2);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("RAILWATCH_THRESHOLD", "1.5");
    assert!(EvalConfig::load().is_err());
    clear_env();

    std::env::set_var("RAILWATCH_FPS_INTERVAL", "0");
    assert!(EvalConfig::load().is_err());
    clear_env();

    std::env::set_var("RAILWATCH_TOLERANCE_SECS", "-1");
    assert!(EvalConfig::load().is_err());
    clear_env();

    std::env::set_var("RAILWATCH_NUM_TRAINS", "several");
    let err = EvalConfig::load().unwrap_err();
    assert!(err.to_string().contains("RAILWATCH_NUM_TRAINS"));
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"stability": {"max_fade": 0}}"#)
        .expect("write config");
    std::env::set_var("RAILWATCH_CONFIG", file.path());
    assert!(EvalConfig::load().is_err());
    clear_env();
}

#[test]
fn rejects_unknown_config_keys() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"detection": {"treshold": 0.5}}"#)
        .expect("write config");
    std::env::set_var("RAILWATCH_CONFIG", file.path());
    assert!(EvalConfig::load().is_err());

    clear_env();
}
