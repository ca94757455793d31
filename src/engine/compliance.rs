// ==========================================
// 地铁夜间编组排班系统 - 合规报告器
// ==========================================
// 职责: 名单的聚合度量投影 + 软约束越界核对
// 红线: 只投影已声明的规则, 不引入新业务逻辑;
//       未纳入模型的软约束 (充足性省略) 不产生违规
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::roster::{
    AgeDistribution, BayAvailability, BrandingDistribution, DepotDistribution,
};
use crate::domain::types::{AdmissionTier, Depot};
use crate::domain::{ComplianceReport, Roster, Violation};
use crate::engine::model::{RosterModel, SoftRule};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

// ==========================================
// ComplianceReporter - 合规报告器
// ==========================================
pub struct ComplianceReporter {
    config: SchedulerConfig,
}

impl ComplianceReporter {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// 从名单与已装配模型生成聚合度量和违规列表
    pub fn report(
        &self,
        roster: &Roster,
        model: &RosterModel,
        today: NaiveDate,
    ) -> (ComplianceReport, Vec<Violation>) {
        let total = roster.selected.len();
        let mut report = ComplianceReport {
            total_trains: total,
            ..ComplianceReport::default()
        };

        if total == 0 {
            return (report, Vec::new());
        }

        // ===== 段分布 =====
        let depot_a = roster
            .selected
            .iter()
            .filter(|e| e.home_depot == Depot::DepotA)
            .count();
        let depot_b = roster
            .selected
            .iter()
            .filter(|e| e.home_depot == Depot::DepotB)
            .count();
        let balance_ratio = if depot_a.max(depot_b) > 0 {
            depot_a.min(depot_b) as f64 / depot_a.max(depot_b) as f64
        } else {
            0.0
        };
        report.depot_distribution = Some(DepotDistribution {
            depot_a,
            depot_b,
            balance_ratio: (balance_ratio * 100.0).round() / 100.0,
        });

        // ===== 车龄分布 =====
        let new_trains = roster
            .selected
            .iter()
            .filter(|e| today.year() - e.year_commissioned <= self.config.age_new_years_max)
            .count();
        report.age_distribution = Some(AgeDistribution {
            new_trains,
            new_train_ratio: (new_trains as f64 / total as f64 * 100.0).round() / 100.0,
        });

        // ===== 厂商分布 =====
        let mut vendors: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &roster.selected {
            *vendors.entry(entry.vendor.clone()).or_insert(0) += 1;
        }
        report.vendor_distribution = vendors;

        // ===== 冠名与股道可用 =====
        let selected_ids: HashSet<i64> = roster.selected.iter().map(|e| e.trainset_id).collect();
        let critical = self.realised(model, &SoftRule::BrandingUrgency, &selected_ids);
        report.branding_priorities = Some(BrandingDistribution {
            critical_campaigns: critical,
            critical_ratio: (critical as f64 / total as f64 * 100.0).round() / 100.0,
        });

        let homed = roster
            .selected
            .iter()
            .filter(|e| e.compliance.home_bay_available)
            .count();
        report.bay_availability = Some(BayAvailability {
            home_bay_available: homed,
            availability_ratio: (homed as f64 / total as f64 * 100.0).round() / 100.0,
        });

        // ===== 放宽注记 =====
        if roster
            .selected
            .iter()
            .any(|e| e.tier == AdmissionTier::Relaxed)
        {
            report.notes.push("relaxed_fitness_used".to_string());
        }
        if roster
            .selected
            .iter()
            .any(|e| e.tier == AdmissionTier::Fallback)
        {
            report.notes.push("fallback_tier_used".to_string());
        }

        // ===== 软约束越界核对 =====
        let violations = self.check_violations(model, &selected_ids);
        debug!(
            selected = total,
            violations = violations.len(),
            "合规报告生成完成"
        );

        (report, violations)
    }

    /// 某规则成员在入选集中的实际数量; 规则未纳入时为 0
    fn realised(&self, model: &RosterModel, rule: &SoftRule, selected: &HashSet<i64>) -> usize {
        model
            .soft_constraints
            .iter()
            .find(|s| s.rule == *rule)
            .map(|s| {
                s.members
                    .iter()
                    .filter(|&&t| selected.contains(&model.candidates[t].trainset_id))
                    .count()
            })
            .unwrap_or(0)
    }

    /// 逐条核对已纳入的软约束
    fn check_violations(&self, model: &RosterModel, selected: &HashSet<i64>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for soft in &model.soft_constraints {
            let realised = soft
                .members
                .iter()
                .filter(|&&t| selected.contains(&model.candidates[t].trainset_id))
                .count() as i64;

            if let Some(lower) = soft.lower {
                if realised < lower {
                    violations.push(Violation::new(
                        soft.rule.to_string(),
                        format!("observed {} below bound {}", realised, lower),
                    ));
                    continue;
                }
            }
            if let Some(upper) = soft.upper {
                if realised > upper {
                    violations.push(Violation::new(
                        soft.rule.to_string(),
                        format!("observed {} above bound {}", realised, upper),
                    ));
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AdmissionTier, OperationalStatus};
    use crate::domain::roster::{ScoreBreakdown, SelectedEntry, TrainCompliance};
    use crate::domain::DimensionScore;
    use crate::engine::model::{BaySlot, CandidateVar, SoftConstraint};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
    }

    fn breakdown() -> ScoreBreakdown {
        ScoreBreakdown {
            fitness: DimensionScore::value(20.0),
            job_card_load: DimensionScore::value(20.0),
            branding: DimensionScore::value(5.0),
            mileage: DimensionScore::value(20.0),
            component_wear: DimensionScore::value(5.0),
            cleaning: DimensionScore::value(5.0),
            stabling_access: DimensionScore::value(5.0),
        }
    }

    fn entry(id: i64, depot: Depot, vendor: &str, year: i32, tier: AdmissionTier) -> SelectedEntry {
        SelectedEntry {
            trainset_id: id,
            rake_number: format!("R{}", 1000 + id),
            status: OperationalStatus::InService,
            vendor: vendor.to_string(),
            year_commissioned: year,
            home_depot: depot,
            score: 80.0,
            breakdown: breakdown(),
            bay_id: id,
            tier,
            reasons: vec!["optimal multi-criteria fit".to_string()],
            compliance: TrainCompliance::new(true, true, true, true, true),
        }
    }

    fn candidate(index: usize, id: i64) -> CandidateVar {
        CandidateVar {
            index,
            fleet_index: index,
            trainset_id: id,
            score_int: 8000,
            depot: Depot::DepotA,
            vendor: "Alstom".to_string(),
            tier: AdmissionTier::Strict,
            is_new: true,
            has_critical_branding: false,
            in_mileage_band: true,
            home_bay_available: true,
            fixed_zero: false,
        }
    }

    fn model_with_soft(soft: Vec<SoftConstraint>, ids: &[i64]) -> RosterModel {
        let candidates: Vec<CandidateVar> = ids
            .iter()
            .enumerate()
            .map(|(index, &id)| candidate(index, id))
            .collect();
        let bays = vec![BaySlot {
            index: 0,
            bay_id: 1,
            depot: Depot::DepotA,
            position_order: 1,
        }];
        let n = candidates.len();
        RosterModel {
            roster_size: 2,
            candidates,
            bays,
            soft_constraints: soft,
            bay_bonus: vec![vec![10]; n],
        }
    }

    #[test]
    fn test_metrics_and_notes() {
        let mut roster = Roster::default();
        roster.selected.push(entry(1, Depot::DepotA, "Alstom", 2023, AdmissionTier::Strict));
        roster.selected.push(entry(2, Depot::DepotB, "BEML", 2012, AdmissionTier::Relaxed));

        let model = model_with_soft(Vec::new(), &[1, 2]);
        let reporter = ComplianceReporter::new(SchedulerConfig::default());
        let (report, violations) = reporter.report(&roster, &model, today());

        let depot = report.depot_distribution.unwrap();
        assert_eq!(depot.depot_a, 1);
        assert_eq!(depot.depot_b, 1);
        assert_eq!(depot.balance_ratio, 1.0);

        let age = report.age_distribution.unwrap();
        assert_eq!(age.new_trains, 1);

        assert_eq!(report.vendor_distribution["Alstom"], 1);
        assert_eq!(report.vendor_distribution["BEML"], 1);

        assert!(report.notes.contains(&"relaxed_fitness_used".to_string()));
        assert!(!report.notes.contains(&"fallback_tier_used".to_string()));
        assert!(violations.is_empty());
    }

    #[test]
    fn test_violation_reports_observed_value() {
        let mut roster = Roster::default();
        roster.selected.push(entry(1, Depot::DepotA, "Alstom", 2023, AdmissionTier::Strict));
        roster.selected.push(entry(2, Depot::DepotA, "Alstom", 2023, AdmissionTier::Strict));

        // 下界 2 的冠名约束, 但入选集只覆盖 1 个成员
        let soft = vec![SoftConstraint {
            rule: SoftRule::BrandingUrgency,
            members: vec![0, 2],
            lower: Some(2),
            upper: None,
        }];
        let model = model_with_soft(soft, &[1, 5, 9]);
        let reporter = ComplianceReporter::new(SchedulerConfig::default());
        let (report, violations) = reporter.report(&roster, &model, today());

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, "branding_urgency");
        assert!(violations[0].detail.contains("observed 1"));
        assert_eq!(
            report.branding_priorities.unwrap().critical_campaigns,
            1
        );
    }

    #[test]
    fn test_omitted_constraint_yields_no_violation() {
        // 单段名单 + 无段平衡约束 (充足性省略): 无违规
        let mut roster = Roster::default();
        for id in 1..=4 {
            roster.selected.push(entry(id, Depot::DepotA, "Alstom", 2023, AdmissionTier::Strict));
        }
        let model = model_with_soft(Vec::new(), &[1, 2, 3, 4]);
        let reporter = ComplianceReporter::new(SchedulerConfig::default());
        let (report, violations) = reporter.report(&roster, &model, today());
        assert!(violations.is_empty());
        let depot = report.depot_distribution.unwrap();
        assert_eq!(depot.depot_a, 4);
        assert_eq!(depot.depot_b, 0);
        assert_eq!(depot.balance_ratio, 0.0);
    }
}
