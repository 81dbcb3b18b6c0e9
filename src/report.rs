//! Final run summary built from the run state.

use tracing::warn;

use crate::types::{
  BestDesignSummary, FinalReport, PerformanceMetrics, ProductReport, ReportSummary, RunState,
};

/// Summary of a finished run. Without a best design only the summary is filled in.
pub fn build_final_report(state: &RunState) -> FinalReport {
  let finished_at = chrono::Utc::now().to_rfc3339();
  let Some(best) = &state.best else {
    warn!(
      iterations = state.current_iteration,
      "no design was ever evaluated, final report has a summary only"
    );
    return FinalReport {
      summary: ReportSummary {
        total_iterations: state.current_iteration,
        best_iteration: None,
        best_score: None,
        success: false,
        finished_at,
      },
      best_design: None,
      product_results: vec![],
      performance_metrics: None,
    };
  };

  let design = &best.design;
  let constraints = &best.evaluation.constraint_check;
  FinalReport {
    summary: ReportSummary {
      total_iterations: state.current_iteration,
      best_iteration: Some(best.iteration),
      best_score: Some(best.score),
      success: best.meets_all_requirements(),
      finished_at,
    },
    best_design: Some(BestDesignSummary {
      process_name: non_empty(&design.process_name, "Unknown"),
      description: non_empty(&design.description, "No description available"),
      property_package: design.property_package.clone(),
    }),
    product_results: best
      .evaluation
      .product_evaluation
      .products
      .iter()
      .map(|p| ProductReport {
        name: p.name.clone(),
        target_production_rate: p.target_production_rate,
        actual_production_rate: p.actual_production_rate,
        target_purity: p.target_purity,
        actual_purity: p.actual_purity,
        target_yield: p.target_yield,
        actual_yield: p.actual_yield,
        specifications_met: p.specifications_met,
      })
      .collect(),
    performance_metrics: Some(PerformanceMetrics {
      mass_balance_error: constraints.mass_balance_error_pct,
      energy_balance_error: constraints.energy_balance_error_pct,
    }),
  }
}

fn non_empty(value: &str, fallback: &str) -> String {
  if value.trim().is_empty() {
    fallback.to_string()
  } else {
    value.to_string()
  }
}
