//! Full design loop through the public API with a shell-script agent and simulator.

#![cfg(unix)]

use std::path::{Path, PathBuf};

use flowsheet_designer::inputs::{load_product_specs, load_raw_materials};
use flowsheet_designer::recorder::{HISTORY_FILENAME, load_history};
use flowsheet_designer::types::{FeedbackStatus, FinalReport};
use flowsheet_designer::{
  ControllerSettings, DesignController, DesignerConfig, ProcessSimulator, RunInputs, RunRecorder,
  XmlModelConverter, from_backend,
};

const AGENT: &str = r#"cat > /dev/null
cat <<'EOF'
Here is the flowsheet:

```json
{
  "process_name": "Ethylene transfer",
  "description": "Single pump",
  "property_package": "Peng-Robinson",
  "unit_operations": [{"id": "P-101", "name": "Feed pump", "type": "pump", "specifications": {}}],
  "streams": [
    {"id": "S1", "type": "feed", "source": "feed", "destination": "P-101",
     "specifications": {"flow_rate": 100, "flow_rate_unit": "kg/h",
       "composition": [{"component": "Ethylene", "fraction": 1.0}]}},
    {"id": "S2", "type": "product", "source": "P-101", "destination": "product", "specifications": {}}
  ]
}
```
EOF
"#;

/// Simulator writing `mass_out` kg/h of output mass against 100 kg/h in; fails without a model.
fn simulator_script(mass_out: f64) -> String {
  format!(
    r#"test -f "$1" || exit 2
cat > "$2" <<'EOF'
{{"status": "success",
 "streams": {{"S2": {{"name": "S2", "from": "P-101", "to": "none", "total_flow": 100.0,
   "flow_unit": "kg/h",
   "components": {{"Ethylene": {{"formula": "C2H4", "mole_fraction": 0.995, "mass_flow": 100.0}}}}}}}},
 "mass_balance": {{"total_input_mass": 100.0, "total_output_mass": {}}},
 "energy_balance": {{"total_energy_in": 0.0, "total_energy_out": 0.0}}}}
EOF
"#,
    mass_out
  )
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
  let path = dir.join(name);
  std::fs::write(&path, content).unwrap();
  path
}

fn fixture(dir: &Path, mass_out: f64, max_iterations: u32) -> PathBuf {
  let agent = write(dir, "agent.sh", AGENT);
  let sim = write(dir, "sim.sh", &simulator_script(mass_out));
  write(
    dir,
    "raw_materials.json",
    r#"{"materials": [{"name": "Ethylene", "formula": "C2H4", "amount": 100, "unit": "kg/h", "state": "gas"}]}"#,
  );
  write(
    dir,
    "product_specs.json",
    r#"{"products": [{"name": "Ethylene", "formula": "C2H4", "min_purity": 0.99,
        "min_yield": 0.9, "target_production_rate": 100, "unit": "kg/h"}]}"#,
  );
  write(
    dir,
    "config.yaml",
    &format!(
      r#"agent:
  max_iterations: {max_iterations}
  save_agent_responses: true
  backend:
    kind: command
    agent_cmd: sh {agent}
simulator:
  command: sh {sim}
  property_package: Peng-Robinson
  timeout_secs: 10
  work_dir: {work}
evaluation:
  mass_balance_tolerance: 1.0
  energy_balance_tolerance: 5.0
  purity_tolerance: 0.01
  yield_tolerance: 0.02
  production_rate_tolerance: 0.05
"#,
      agent = agent.display(),
      sim = sim.display(),
      work = dir.join("work").display(),
    ),
  )
}

async fn run_loop(dir: &Path, config_path: &Path) -> flowsheet_designer::RunOutcome {
  let config = DesignerConfig::from_yaml_file(config_path).unwrap();
  let controller = DesignController::new(
    from_backend(&config.agent.backend).unwrap(),
    XmlModelConverter::new(
      config.simulator.property_package.clone(),
      config.simulator.calculation_mode.clone(),
    ),
    ProcessSimulator::new(&config.simulator).unwrap(),
    ControllerSettings::from_config(&config),
    RunInputs {
      raw_materials: load_raw_materials(&dir.join("raw_materials.json")).unwrap(),
      product_specs: load_product_specs(&dir.join("product_specs.json")).unwrap(),
      config_snapshot: config.persisted(),
    },
    RunRecorder::create(&dir.join("output")).unwrap(),
  );
  controller.run().await.unwrap()
}

#[tokio::test]
async fn balanced_design_succeeds_first_iteration() {
  let dir = tempfile::tempdir().unwrap();
  let config = fixture(dir.path(), 100.0, 3);
  let outcome = run_loop(dir.path(), &config).await;

  assert!(outcome.success);
  assert_eq!(outcome.iterations, 1);
  assert_eq!(outcome.best_score, Some(100.0));

  let iter1 = outcome.run_dir.join("iteration_1");
  for file in [
    "process_design.json",
    "raw_response.txt",
    "model.dwxml",
    "simulation_results.json",
    "evaluation.json",
    "feedback.json",
  ] {
    assert!(iter1.join(file).is_file(), "missing {}", file);
  }
  let model = std::fs::read_to_string(iter1.join("model.dwxml")).unwrap();
  assert!(model.contains("Type=\"Pump\""));

  let report: FinalReport =
    serde_json::from_slice(&std::fs::read(outcome.run_dir.join("final_report.json")).unwrap())
      .unwrap();
  assert!(report.summary.success);
  assert_eq!(report.best_design.unwrap().process_name, "Ethylene transfer");
  assert!(outcome.run_dir.join("config.json").is_file());
}

#[tokio::test]
async fn unbalanced_design_exhausts_budget() {
  let dir = tempfile::tempdir().unwrap();
  let config = fixture(dir.path(), 90.0, 2);
  let outcome = run_loop(dir.path(), &config).await;

  assert!(!outcome.success);
  assert_eq!(outcome.iterations, 2);
  assert_eq!(outcome.best_iteration, Some(1));
  assert_eq!(outcome.best_score, Some(50.0));

  let history = load_history(&outcome.run_dir.join(HISTORY_FILENAME)).unwrap();
  assert_eq!(history.len(), 2);
  assert!(
    history
      .iter()
      .all(|r| r.status() == FeedbackStatus::ConstraintViolation)
  );
  let trace = std::fs::read_to_string(outcome.run_dir.join("score_trace.csv")).unwrap();
  assert_eq!(trace.lines().count(), 3);
}
