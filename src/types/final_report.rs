//! DTOs for final_report.json: summary of a finished run.

use serde::{Deserialize, Serialize};

/// Root structure for final_report.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
  pub summary: ReportSummary,
  /// None when no iteration ever reached evaluation.
  pub best_design: Option<BestDesignSummary>,
  pub product_results: Vec<ProductReport>,
  pub performance_metrics: Option<PerformanceMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
  pub total_iterations: u32,
  pub best_iteration: Option<u32>,
  pub best_score: Option<f64>,
  /// Best design satisfies both balances and every product spec.
  pub success: bool,
  /// ISO 8601 timestamp when the run finished.
  pub finished_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestDesignSummary {
  pub process_name: String,
  pub description: String,
  pub property_package: String,
}

/// Target vs actual for one product of the best design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReport {
  pub name: String,
  pub target_production_rate: f64,
  pub actual_production_rate: Option<f64>,
  pub target_purity: f64,
  pub actual_purity: Option<f64>,
  pub target_yield: f64,
  pub actual_yield: Option<f64>,
  pub specifications_met: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
  pub mass_balance_error: f64,
  pub energy_balance_error: f64,
}
