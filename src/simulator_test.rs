//! Tests for `simulator`.

use std::fs;
use std::time::Duration;

use crate::config::SimulatorConfig;
use crate::error::SimulationError;
use crate::simulator::{ProcessSimulator, read_results};

fn config(command: &str, work_dir: &std::path::Path) -> SimulatorConfig {
  SimulatorConfig {
    command: command.to_string(),
    args: vec![],
    property_package: "NRTL".to_string(),
    calculation_mode: "Sequential".to_string(),
    timeout_secs: 5,
    work_dir: Some(work_dir.to_path_buf()),
  }
}

#[test]
fn empty_command_rejected() {
  let dir = tempfile::tempdir().unwrap();
  assert!(matches!(
    ProcessSimulator::new(&config("   ", dir.path())),
    Err(SimulationError::EmptyCommand)
  ));
}

#[test]
fn error_status_document_is_reported() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("r.json");
  fs::write(&path, r#"{"status": "error", "message": "Simulation failed to converge."}"#).unwrap();
  match read_results(&path) {
    Err(SimulationError::Reported(m)) => assert_eq!(m, "Simulation failed to converge."),
    other => panic!("unexpected {:?}", other),
  }
}

#[test]
fn success_document_parses_and_ignores_status() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("r.json");
  fs::write(
    &path,
    r#"{"status": "success",
        "streams": {"S1": {"name": "Feed", "from": "none", "to": "R-101", "total_flow": 100.0}},
        "mass_balance": {"total_input_mass": 100.0, "total_output_mass": 99.5}}"#,
  )
  .unwrap();
  let r = read_results(&path).unwrap();
  assert_eq!(r.streams.len(), 1);
  assert_eq!(r.mass_balance.unwrap().total_output_mass, 99.5);
}

#[test]
fn missing_and_malformed_results() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("r.json");
  assert!(matches!(
    read_results(&path),
    Err(SimulationError::MissingResults(_))
  ));
  fs::write(&path, "{not json").unwrap();
  assert!(matches!(
    read_results(&path),
    Err(SimulationError::Malformed(_))
  ));
}

#[cfg(unix)]
mod process {
  use super::*;
  use crate::converter::ModelArtifact;
  use crate::simulator::Simulator;

  fn model() -> ModelArtifact {
    ModelArtifact {
      file_name: "model.dwxml".to_string(),
      content: "<DWSIM Version=\"5.0\"/>".to_string(),
    }
  }

  fn simulator(dir: &std::path::Path, body: &str) -> ProcessSimulator {
    let script = dir.join("sim.sh");
    fs::write(&script, body).unwrap();
    let work = dir.join("work");
    ProcessSimulator::new(&config(&format!("sh {}", script.display()), &work)).unwrap()
  }

  #[tokio::test]
  async fn runs_model_and_reads_results() {
    let dir = tempfile::tempdir().unwrap();
    let sim = simulator(
      dir.path(),
      "grep -q DWSIM \"$1\" || exit 9\n\
       echo '{\"mass_balance\": {\"total_input_mass\": 10, \"total_output_mass\": 10}}' > \"$2\"\n",
    );
    let r = sim.run(&model(), Duration::from_secs(10)).await.unwrap();
    assert_eq!(r.mass_balance.unwrap().total_input_mass, 10.0);
  }

  #[tokio::test]
  async fn placeholders_expand_in_args() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("sim.sh");
    fs::write(&script, "cp \"$2\" /dev/null && echo '{}' > \"$4\"\n").unwrap();
    let mut cfg = config(&format!("sh {}", script.display()), &dir.path().join("work"));
    cfg.args = vec![
      "--model".to_string(),
      "{model}".to_string(),
      "--out".to_string(),
      "{results}".to_string(),
    ];
    let sim = ProcessSimulator::new(&cfg).unwrap();
    let r = sim.run(&model(), Duration::from_secs(10)).await.unwrap();
    assert!(r.streams.is_empty());
  }

  #[tokio::test]
  async fn non_zero_exit_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let sim = simulator(dir.path(), "exit 2\n");
    match sim.run(&model(), Duration::from_secs(10)).await {
      Err(SimulationError::Exit(m)) => assert_eq!(m, "exit code 2"),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn silent_simulator_has_missing_results() {
    let dir = tempfile::tempdir().unwrap();
    let sim = simulator(dir.path(), "true\n");
    assert!(matches!(
      sim.run(&model(), Duration::from_secs(10)).await,
      Err(SimulationError::MissingResults(_))
    ));
  }

  #[tokio::test]
  async fn slow_simulator_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let sim = simulator(dir.path(), "sleep 30\n");
    let started = std::time::Instant::now();
    let res = sim.run(&model(), Duration::from_millis(200)).await;
    assert!(matches!(res, Err(SimulationError::Timeout(_))));
    assert!(started.elapsed() < Duration::from_secs(10));
  }

  /// True while `pid` is a live, non-zombie process.
  #[cfg(target_os = "linux")]
  fn alive(pid: &str) -> bool {
    match fs::read_to_string(format!("/proc/{}/stat", pid)) {
      Ok(stat) => !stat
        .rsplit(')')
        .next()
        .is_some_and(|rest| rest.trim_start().starts_with('Z')),
      Err(_) => false,
    }
  }

  #[cfg(target_os = "linux")]
  #[tokio::test]
  async fn timeout_kills_processes_started_by_wrapper_script() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("sleep.pid");
    let sim = simulator(
      dir.path(),
      &format!("sleep 30 &\necho $! > {}\nwait\n", pid_file.display()),
    );
    let res = sim.run(&model(), Duration::from_millis(500)).await;
    assert!(matches!(res, Err(SimulationError::Timeout(_))));

    let pid = fs::read_to_string(&pid_file).unwrap();
    let pid = pid.trim();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while alive(pid) && std::time::Instant::now() < deadline {
      tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!alive(pid), "sleep {} outlived the timed-out simulator", pid);
  }

  #[tokio::test]
  async fn missing_program_is_spawn_error() {
    let dir = tempfile::tempdir().unwrap();
    let sim = ProcessSimulator::new(&config("/nonexistent/simulator", dir.path())).unwrap();
    assert!(matches!(
      sim.run(&model(), Duration::from_secs(1)).await,
      Err(SimulationError::Spawn(_))
    ));
  }
}
