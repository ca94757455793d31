// ==========================================
// 地铁夜间编组排班系统 - 结果报告投影
// ==========================================
// 红线: 字段名与字段顺序是对外契约, 不做业务计算
// ==========================================

use crate::domain::types::RosterStatus;
use crate::domain::{
    ComplianceReport, OptimiseResult, RejectedEntry, SelectedEntry, SolverStats, Violation,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// SchedulingSummary - 排班摘要
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingSummary {
    pub scheduling_date: NaiveDate,
    pub status: RosterStatus,
    pub roster_size: usize,
    pub fleet_considered: usize,
    pub objective_value: f64,
    pub optimization_score: f64,
    pub execution_ms: u64,
    pub violations: Vec<Violation>,
    pub solver_stats: Option<SolverStats>,
}

// ==========================================
// InductionReport - 稳定有序的结果文档
// ==========================================
// 序列化字段顺序即结构体声明顺序:
// scheduling_summary, compliance, selected, rejected, bay_assignments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InductionReport {
    pub scheduling_summary: SchedulingSummary,
    pub compliance: ComplianceReport,
    pub selected: Vec<SelectedEntry>,
    pub rejected: Vec<RejectedEntry>,
    pub bay_assignments: BTreeMap<String, i64>, // 编组号 -> 股道号
}

impl InductionReport {
    /// 纯投影: 不读取结果以外的任何数据
    pub fn from_result(result: &OptimiseResult) -> Self {
        let bay_assignments = result
            .selected
            .iter()
            .map(|entry| (entry.rake_number.clone(), entry.bay_id))
            .collect();

        Self {
            scheduling_summary: SchedulingSummary {
                scheduling_date: result.scheduling_date,
                status: result.status,
                roster_size: result.roster_size,
                fleet_considered: result.selected.len() + result.rejected.len(),
                objective_value: result.objective_value,
                optimization_score: result.optimization_score,
                execution_ms: result.execution_ms,
                violations: result.violations.clone(),
                solver_stats: result.solver_stats.clone(),
            },
            compliance: result.compliance.clone(),
            selected: result.selected.clone(),
            rejected: result.rejected.clone(),
            bay_assignments,
        }
    }
}
