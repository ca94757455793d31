// ==========================================
// 地铁夜间编组排班系统 - 排班结果领域模型
// ==========================================
// 不变量: 非 infeasible 结果 |selected| = roster_size,
//         selected 与 rejected 不相交, 每列车至多一条股道
// ==========================================

use crate::domain::types::{AdmissionTier, Depot, OperationalStatus, RosterStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// DimensionScore - 单维度得分
// ==========================================
// 显式区分正常值与保守降级值, 聚合时全量参与
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionScore {
    Value(f64),
    Fallback { points: f64, reason: String },
}

impl DimensionScore {
    pub fn value(points: f64) -> Self {
        DimensionScore::Value(points)
    }

    pub fn fallback(points: f64, reason: impl Into<String>) -> Self {
        DimensionScore::Fallback {
            points,
            reason: reason.into(),
        }
    }

    pub fn points(&self) -> f64 {
        match self {
            DimensionScore::Value(p) => *p,
            DimensionScore::Fallback { points, .. } => *points,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DimensionScore::Fallback { .. })
    }
}

// ==========================================
// ScoreBreakdown - 六维评分明细
// ==========================================
// 各维度封顶: 25 + 20 + 15 + 20 + 5 + 10 + 5 = 100
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub fitness: DimensionScore,         // 适运证书 (25)
    pub job_card_load: DimensionScore,   // 工单负荷 (20)
    pub branding: DimensionScore,        // 冠名曝光 (15)
    pub mileage: DimensionScore,         // 走行均衡 (20)
    pub component_wear: DimensionScore,  // 部件磨耗 (5)
    pub cleaning: DimensionScore,        // 清洁时效 (10)
    pub stabling_access: DimensionScore, // 股道可达 (5)
}

impl ScoreBreakdown {
    pub fn dimension_sum(&self) -> f64 {
        self.fitness.points()
            + self.job_card_load.points()
            + self.branding.points()
            + self.mileage.points()
            + self.component_wear.points()
            + self.cleaning.points()
            + self.stabling_access.points()
    }
}

// ==========================================
// Score - 综合优先级得分
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub total: f64, // 维度之和, [0, 100]
    pub breakdown: ScoreBreakdown,
}

impl Score {
    /// 展示值: 一位小数
    pub fn display_total(&self) -> f64 {
        (self.total * 10.0).round() / 10.0
    }

    /// 求解目标系数: round(score * 100), 保持单调性
    pub fn objective_coefficient(&self) -> i64 {
        (self.total * 100.0).round() as i64
    }
}

// ==========================================
// TrainCompliance - 单车合规快照
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainCompliance {
    pub fitness_certificates_valid: bool, // 三域证书全部有效
    pub no_emergency_jobs: bool,
    pub not_in_maintenance: bool,
    pub mileage_balanced: bool,
    pub home_bay_available: bool,
    pub overall_compliance: f64, // 上述各项的满足比例
}

impl TrainCompliance {
    pub fn new(
        fitness_certificates_valid: bool,
        no_emergency_jobs: bool,
        not_in_maintenance: bool,
        mileage_balanced: bool,
        home_bay_available: bool,
    ) -> Self {
        let flags = [
            fitness_certificates_valid,
            no_emergency_jobs,
            not_in_maintenance,
            mileage_balanced,
            home_bay_available,
        ];
        let satisfied = flags.iter().filter(|f| **f).count();
        Self {
            fitness_certificates_valid,
            no_emergency_jobs,
            not_in_maintenance,
            mileage_balanced,
            home_bay_available,
            overall_compliance: satisfied as f64 / flags.len() as f64,
        }
    }
}

// ==========================================
// SelectedEntry / RejectedEntry - 排班名单条目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedEntry {
    pub trainset_id: i64,
    pub rake_number: String,
    pub status: OperationalStatus,
    pub vendor: String,
    pub year_commissioned: i32,
    pub home_depot: Depot,
    pub score: f64, // 一位小数展示值
    pub breakdown: ScoreBreakdown,
    pub bay_id: i64,
    pub tier: AdmissionTier,
    pub reasons: Vec<String>,
    pub compliance: TrainCompliance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedEntry {
    pub trainset_id: i64,
    pub rake_number: String,
    pub status: OperationalStatus,
    pub vendor: String,
    pub year_commissioned: i32,
    pub home_depot: Depot,
    pub score: f64,
    pub tier: Option<AdmissionTier>, // 未入池为 None
    pub exclusion_reason: String,
    pub compliance: TrainCompliance,
}

// ==========================================
// Roster - 当日排班名单
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    pub selected: Vec<SelectedEntry>,
    pub rejected: Vec<RejectedEntry>,
}

// ==========================================
// ComplianceReport - 聚合合规度量
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepotDistribution {
    pub depot_a: usize,
    pub depot_b: usize,
    pub balance_ratio: f64, // min/max, 单段时为 0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeDistribution {
    pub new_trains: usize, // 投运年限不超过阈值的车数
    pub new_train_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandingDistribution {
    pub critical_campaigns: usize,
    pub critical_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayAvailability {
    pub home_bay_available: usize,
    pub availability_ratio: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub total_trains: usize,
    pub depot_distribution: Option<DepotDistribution>,
    pub age_distribution: Option<AgeDistribution>,
    pub vendor_distribution: BTreeMap<String, usize>,
    pub branding_priorities: Option<BrandingDistribution>,
    pub bay_availability: Option<BayAvailability>,
    pub notes: Vec<String>, // relaxed_fitness_used / fallback_tier_used 等注记
}

// ==========================================
// Violation - 软约束越界记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub detail: String,
}

impl Violation {
    pub fn new(rule: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            detail: detail.into(),
        }
    }
}

// ==========================================
// SolverStats - 求解器统计
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverStats {
    pub total_variables: usize,
    pub total_constraints: usize,
    pub objective_value: f64,
}

// ==========================================
// OptimiseRequest / OptimiseResult - 门面契约
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimiseRequest {
    pub snapshot_time: DateTime<Utc>,
    pub roster_size: Option<usize>,         // 缺省取配置值 (24)
    pub solver_budget_seconds: Option<f64>, // 缺省取配置值 (10)
}

impl OptimiseRequest {
    pub fn new(snapshot_time: DateTime<Utc>) -> Self {
        Self {
            snapshot_time,
            roster_size: None,
            solver_budget_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimiseResult {
    pub status: RosterStatus,
    pub scheduling_date: NaiveDate,
    pub roster_size: usize,
    pub selected: Vec<SelectedEntry>,
    pub rejected: Vec<RejectedEntry>,
    pub objective_value: f64,
    pub optimization_score: f64, // 入选车平均得分, 一位小数
    pub compliance: ComplianceReport,
    pub violations: Vec<Violation>,
    pub solver_stats: Option<SolverStats>,
    pub execution_ms: u64,
}

impl OptimiseResult {
    /// 不可行结果的统一构造 (空名单 + 诊断注记)
    pub fn infeasible(
        scheduling_date: NaiveDate,
        roster_size: usize,
        rejected: Vec<RejectedEntry>,
        diagnostic: Violation,
        execution_ms: u64,
    ) -> Self {
        Self {
            status: RosterStatus::Infeasible,
            scheduling_date,
            roster_size,
            selected: Vec::new(),
            rejected,
            objective_value: 0.0,
            optimization_score: 0.0,
            compliance: ComplianceReport::default(),
            violations: vec![diagnostic],
            solver_stats: None,
            execution_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_score_points() {
        assert_eq!(DimensionScore::value(8.33).points(), 8.33);
        let fb = DimensionScore::fallback(5.0, "certificate date unparseable");
        assert_eq!(fb.points(), 5.0);
        assert!(fb.is_fallback());
    }

    #[test]
    fn test_score_objective_coefficient_is_monotone_rounding() {
        let breakdown = ScoreBreakdown {
            fitness: DimensionScore::value(24.99),
            job_card_load: DimensionScore::value(20.0),
            branding: DimensionScore::value(15.0),
            mileage: DimensionScore::value(20.0),
            component_wear: DimensionScore::value(5.0),
            cleaning: DimensionScore::value(10.0),
            stabling_access: DimensionScore::value(5.0),
        };
        let score = Score {
            total: breakdown.dimension_sum(),
            breakdown,
        };
        assert_eq!(score.objective_coefficient(), 9999);
        assert_eq!(score.display_total(), 100.0);
    }

    #[test]
    fn test_train_compliance_ratio() {
        let c = TrainCompliance::new(true, true, true, false, false);
        assert_eq!(c.overall_compliance, 0.6);
    }
}
