//! CLI: run the iterative process design loop.
//!
//! Loads the run configuration, the raw materials and the product specifications, then
//! alternates design proposals and simulations until a design meets every requirement or
//! the iteration budget is spent. Exits 0 only when a design met every requirement.
//!
//! Usage: `design_process --raw-materials <FILE> --product-specs <FILE> [OPTIONS]`
//!
//! Set RUST_LOG=flowsheet_designer=trace for span enter/exit and per-phase events.

use clap::Parser;
use flowsheet_designer::config::{AGENT_CMD_ENV, SIMULATOR_CMD_ENV};
use flowsheet_designer::inputs::{load_product_specs, load_raw_materials};
use flowsheet_designer::{
  ControllerSettings, DesignController, DesignerConfig, ProcessSimulator, RunInputs, RunRecorder,
  XmlModelConverter, from_backend,
};
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Iteratively design a chemical process with a language model and a process simulator.
#[derive(Parser, Debug)]
#[command(name = "design_process")]
#[command(after_help = r#"Environment variables (override the config file when set):
  DESIGNER_AGENT_CMD       Agent command for a `command` backend. The design request is
                           written to its stdin; the design is read from stdout or from
                           design.json in the backend's stage_dir.
  DESIGNER_SIMULATOR_CMD   Simulator command.
  RUST_LOG                 Log filter (takes precedence over --verbose).

Examples:
  design_process --raw-materials feed.json --product-specs products.json
  design_process --raw-materials feed.json --product-specs products.json \
    --config demos/config.yaml --max-iterations 3 --property-package Peng-Robinson"#)]
struct Args {
  /// JSON file listing the available raw materials
  #[arg(long, value_name = "FILE")]
  raw_materials: PathBuf,

  /// JSON file listing the target products
  #[arg(long, value_name = "FILE")]
  product_specs: PathBuf,

  /// YAML run configuration
  #[arg(long, value_name = "FILE", default_value = "config.yaml")]
  config: PathBuf,

  /// Directory that receives the run directory
  #[arg(long, value_name = "DIR", default_value = "output")]
  output_dir: PathBuf,

  /// Thermodynamic property package. Overrides simulator.property_package.
  #[arg(long, value_name = "NAME")]
  property_package: Option<String>,

  /// Iteration budget. Overrides agent.max_iterations.
  #[arg(long, value_name = "N")]
  max_iterations: Option<u32>,

  /// Log at debug level unless RUST_LOG is set
  #[arg(long, short)]
  verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
  let args = Args::parse();
  let default_level = if args.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
    )
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .init();

  info!("design_process starting");

  let mut config = match DesignerConfig::from_yaml_file(&args.config) {
    Ok(c) => c,
    Err(e) => {
      eprintln!("Error loading configuration: {}", e);
      process::exit(1);
    }
  };
  // Env vars replace the commands; flags replace the budget and property package.
  config.apply_env_overrides();
  config.apply_overrides(args.property_package.as_deref(), args.max_iterations);
  if let Err(e) = config.validate() {
    eprintln!("Invalid configuration: {}", e);
    process::exit(1);
  }
  info!(
    agent_cmd_env = std::env::var(AGENT_CMD_ENV).is_ok(),
    simulator_cmd_env = std::env::var(SIMULATOR_CMD_ENV).is_ok(),
    max_iterations = config.agent.max_iterations,
    property_package = %config.simulator.property_package,
    "options (env, flags or config)"
  );

  let raw_materials = match load_raw_materials(&args.raw_materials) {
    Ok(r) => r,
    Err(e) => {
      eprintln!("Error loading raw materials: {}", e);
      process::exit(1);
    }
  };
  let product_specs = match load_product_specs(&args.product_specs) {
    Ok(p) => p,
    Err(e) => {
      eprintln!("Error loading product specifications: {}", e);
      process::exit(1);
    }
  };

  let generator = match from_backend(&config.agent.backend) {
    Ok(g) => g,
    Err(e) => {
      eprintln!("Error creating design generator: {}", e);
      process::exit(1);
    }
  };
  let simulator = match ProcessSimulator::new(&config.simulator) {
    Ok(s) => s,
    Err(e) => {
      eprintln!("Error creating simulator: {}", e);
      process::exit(1);
    }
  };
  let converter = XmlModelConverter::new(
    config.simulator.property_package.clone(),
    config.simulator.calculation_mode.clone(),
  );
  let recorder = match RunRecorder::create(&args.output_dir) {
    Ok(r) => r,
    Err(e) => {
      eprintln!("Error creating run directory: {}", e);
      process::exit(1);
    }
  };

  let controller = DesignController::new(
    generator,
    converter,
    simulator,
    ControllerSettings::from_config(&config),
    RunInputs {
      raw_materials,
      product_specs,
      config_snapshot: config.persisted(),
    },
    recorder,
  );

  let outcome = match controller.run().await {
    Ok(o) => o,
    Err(e) => {
      eprintln!("Run aborted: {}", e);
      process::exit(1);
    }
  };

  info!(success = outcome.success, iterations = outcome.iterations, "design run completed");
  println!("Design run completed.");
  println!("  Run directory: {}", outcome.run_dir.display());
  println!("  Iterations: {}", outcome.iterations);
  match (outcome.best_iteration, outcome.best_score) {
    (Some(i), Some(s)) => println!("  Best design: iteration {} (score {:.2})", i, s),
    _ => println!("  Best design: none"),
  }
  println!(
    "  Status: {}",
    if outcome.success {
      "all requirements met"
    } else {
      "requirements not met"
    }
  );
  if !outcome.success {
    process::exit(1);
  }
}
