use std::fs;

use clap::Parser;
use gridrl::{
    RunSummary,
    cli::commands::train::{TrainArgs, execute},
};
use tempfile::tempdir;

fn parse_args<I, T>(args: I) -> TrainArgs
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    TrainArgs::parse_from(args)
}

#[test]
fn test_train_writes_metrics_csv_and_run_summary() {
    let tmp = tempdir().unwrap();
    let csv_path = tmp.path().join("metrics.csv");
    let json_path = tmp.path().join("run.json");

    let args = parse_args([
        "gridrl-train",
        "--episodes",
        "6",
        "--seed",
        "9",
        "--algorithm",
        "sarsa",
        "--goal",
        "0,3,1.0",
        "--quiet",
        "--metrics-csv",
        csv_path.to_str().unwrap(),
        "--run-json",
        json_path.to_str().unwrap(),
    ]);
    execute(args).expect("training should succeed");

    let csv = fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "episode,steps,episode_reward,success,epsilon,alpha,gamma,rows,cols,step_penalty,algorithm,seed,goal_count,goal_interval"
    );
    assert_eq!(lines.count(), 6);

    let summary = RunSummary::load(&json_path).unwrap();
    assert_eq!(summary.config.episodes, 6);
    assert_eq!(summary.config.seed, 9);
    assert!((0.0..=1.0).contains(&summary.summary.success_rate));
    assert!(summary.summary.avg_steps > 0.0);
}

#[test]
fn test_config_file_provides_base_values() {
    let tmp = tempdir().unwrap();
    let config_path = tmp.path().join("config.json");
    let json_path = tmp.path().join("run.json");
    fs::write(
        &config_path,
        r#"{"episodes": 4, "rows": 3, "cols": 5, "algorithm": "q-learning"}"#,
    )
    .unwrap();

    let args = parse_args([
        "gridrl-train",
        "--config",
        config_path.to_str().unwrap(),
        "--episodes",
        "3",
        "--quiet",
        "--run-json",
        json_path.to_str().unwrap(),
    ]);
    execute(args).expect("training should succeed");

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["config"]["episodes"], 3);
    assert_eq!(value["config"]["rows"], 3);
    assert_eq!(value["config"]["cols"], 5);
    assert_eq!(value["config"]["algorithm"], "q-learning");
}

#[test]
fn test_invalid_flags_are_reported() {
    let args = parse_args(["gridrl-train", "--alpha", "2.0"]);
    let err = execute(args).unwrap_err();
    assert!(err.to_string().contains("alpha"));
}

#[test]
fn test_zero_epsilon_is_rejected_instead_of_replaced() {
    let args = parse_args(["gridrl-train", "--epsilon", "0", "--epsilon-min", "0"]);
    let err = execute(args).unwrap_err();
    assert!(err.to_string().contains("epsilon"), "unexpected error: {err}");
}

#[test]
fn test_infinite_penalty_is_rejected() {
    let args = parse_args(["gridrl-train", "--step-penalty", "inf"]);
    let err = execute(args).unwrap_err();
    assert!(err.to_string().contains("step-penalty"), "unexpected error: {err}");
}
