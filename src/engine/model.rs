// ==========================================
// 地铁夜间编组排班系统 - 约束模型构建器
// ==========================================
// 职责: 从入池候选生成求解器无关的选择/落股模型
// 红线: 软约束仅在候选充足时纳入 (充足性规则)
// 红线: 目标函数与约束全部整数系数, 不引入非线性项
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::types::{AdmissionTier, Depot};
use crate::domain::{Score, StablingBay, TrainsetSnapshot};
use crate::engine::eligibility::PoolEntry;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

// ==========================================
// CandidateVar - 选择变量 x[t]
// ==========================================
#[derive(Debug, Clone)]
pub struct CandidateVar {
    pub index: usize,       // 模型内变量下标
    pub fleet_index: usize, // 编排层快照数组下标
    pub trainset_id: i64,
    pub score_int: i64, // round(score * 100), 目标系数
    pub depot: Depot,
    pub vendor: String,
    pub tier: AdmissionTier,
    pub is_new: bool,
    pub has_critical_branding: bool,
    pub in_mileage_band: bool,
    pub home_bay_available: bool,
    pub fixed_zero: bool, // 兜底层候选在严格/放宽候选充足时钉死为 0
}

// ==========================================
// BaySlot - 落股变量 y[t,b] 的股道侧
// ==========================================
#[derive(Debug, Clone)]
pub struct BaySlot {
    pub index: usize,
    pub bay_id: i64,
    pub depot: Depot,
    pub position_order: i32,
}

// ==========================================
// SoftRule / SoftConstraint - 软约束
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftRule {
    DepotBalance,
    AgeDiversity,
    VendorDiversity(String),
    BrandingUrgency,
    MileageBand,
    BayPreference,
}

impl fmt::Display for SoftRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftRule::DepotBalance => write!(f, "depot_balance"),
            SoftRule::AgeDiversity => write!(f, "age_diversity"),
            SoftRule::VendorDiversity(vendor) => write!(f, "vendor_diversity:{}", vendor),
            SoftRule::BrandingUrgency => write!(f, "branding_urgency"),
            SoftRule::MileageBand => write!(f, "mileage_band"),
            SoftRule::BayPreference => write!(f, "bay_preference"),
        }
    }
}

/// 有界不等式: lower <= Σ_{t∈members} x[t] <= upper
#[derive(Debug, Clone)]
pub struct SoftConstraint {
    pub rule: SoftRule,
    pub members: Vec<usize>, // 候选变量下标
    pub lower: Option<i64>,
    pub upper: Option<i64>,
}

impl SoftConstraint {
    fn bound_count(&self) -> usize {
        self.lower.is_some() as usize + self.upper.is_some() as usize
    }
}

// ==========================================
// RosterModel - 装配完成的模型
// ==========================================
#[derive(Debug, Clone)]
pub struct RosterModel {
    pub roster_size: usize,
    pub candidates: Vec<CandidateVar>,
    pub bays: Vec<BaySlot>,
    pub soft_constraints: Vec<SoftConstraint>,
    pub bay_bonus: Vec<Vec<i64>>, // [候选][股道], round(10 * 可达性 * 段兼容)
}

impl RosterModel {
    pub fn total_variables(&self) -> usize {
        self.candidates.len() + self.candidates.len() * self.bays.len()
    }

    /// 约束条数: 选数 1 + 每车落股耦合 n + 每股容量 m + 钉零数 + 软约束界数
    pub fn total_constraints(&self) -> usize {
        let fixed = self.candidates.iter().filter(|c| c.fixed_zero).count();
        let soft: usize = self.soft_constraints.iter().map(|s| s.bound_count()).sum();
        1 + self.candidates.len() + self.bays.len() + fixed + soft
    }
}

// ==========================================
// RosterModelBuilder - 模型构建器
// ==========================================
// 每次调用独立持有变量与约束, 不保留模块级状态
pub struct RosterModelBuilder {
    config: SchedulerConfig,
}

impl RosterModelBuilder {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// 装配模型
    ///
    /// # 参数
    /// - `pool`: 准入闸门输出
    /// - `fleet` / `scores` / `home_available`: 与编排层快照数组对齐
    /// - `bays`: 可用股道 (未占用且未封锁)
    pub fn build(
        &self,
        pool: &[PoolEntry],
        fleet: &[TrainsetSnapshot],
        scores: &[Score],
        home_available: &[bool],
        bays: &[StablingBay],
        today: NaiveDate,
    ) -> RosterModel {
        let (band_lo, band_hi) = self.config.mileage_band;
        let strict_relaxed = pool
            .iter()
            .filter(|e| e.tier != AdmissionTier::Fallback)
            .count();
        let fallback_fixable = strict_relaxed >= self.config.roster_size;

        let mut candidates = Vec::with_capacity(pool.len());
        for (index, entry) in pool.iter().enumerate() {
            let snapshot = &fleet[entry.index];
            let score = &scores[entry.index];
            let km = snapshot.mileage.total_km;
            let age = today.year() - snapshot.trainset.year_commissioned;

            // 兜底层里证书全无或带阻断工单的车, 仅在严格/放宽候选
            // 已够目标数时钉死; 否则保持自由 (闸门已证明其必要性)
            let blocking = snapshot.valid_certificate_count(today) == 0
                || snapshot.has_open_emergency_job();
            let fixed_zero =
                entry.tier == AdmissionTier::Fallback && blocking && fallback_fixable;

            candidates.push(CandidateVar {
                index,
                fleet_index: entry.index,
                trainset_id: snapshot.trainset_id(),
                score_int: score.objective_coefficient(),
                depot: snapshot.trainset.home_depot,
                vendor: snapshot.trainset.vendor.clone(),
                tier: entry.tier,
                is_new: age <= self.config.age_new_years_max,
                has_critical_branding: snapshot.has_active_critical_branding(today),
                in_mileage_band: (band_lo..=band_hi).contains(&km),
                home_bay_available: home_available[entry.index],
                fixed_zero,
            });
        }

        let bay_slots: Vec<BaySlot> = bays
            .iter()
            .enumerate()
            .map(|(index, bay)| BaySlot {
                index,
                bay_id: bay.bay_id,
                depot: bay.depot,
                position_order: bay.position_order,
            })
            .collect();

        let bay_bonus = Self::bay_bonus_matrix(&candidates, &bay_slots);
        let soft_constraints = self.build_soft_constraints(&candidates);

        let model = RosterModel {
            roster_size: self.config.roster_size,
            candidates,
            bays: bay_slots,
            soft_constraints,
            bay_bonus,
        };

        debug!(
            candidates = model.candidates.len(),
            bays = model.bays.len(),
            soft_constraints = model.soft_constraints.len(),
            variables = model.total_variables(),
            "约束模型装配完成"
        );

        model
    }

    /// 落股奖励: round(10 * 可达性 * 段兼容)
    ///
    /// 可达性 = (N_max - position_order + 1) / N_max, 股位越靠前越高;
    /// 段兼容 = 同段 1.0, 异段 0.5
    fn bay_bonus_matrix(candidates: &[CandidateVar], bays: &[BaySlot]) -> Vec<Vec<i64>> {
        let n_max = bays.iter().map(|b| b.position_order).max().unwrap_or(1).max(1) as f64;
        candidates
            .iter()
            .map(|candidate| {
                bays.iter()
                    .map(|bay| {
                        let accessibility = (n_max - bay.position_order as f64 + 1.0) / n_max;
                        let compatibility = if candidate.depot != Depot::Unknown
                            && candidate.depot == bay.depot
                        {
                            1.0
                        } else {
                            0.5
                        };
                        (10.0 * accessibility * compatibility).round() as i64
                    })
                    .collect()
            })
            .collect()
    }

    /// 软约束装配, 每条受充足性规则守卫
    fn build_soft_constraints(&self, candidates: &[CandidateVar]) -> Vec<SoftConstraint> {
        let cfg = &self.config;
        let mut constraints = Vec::new();

        // S1 段平衡: 两段各有候选时, A 段入选数落在 [lo, hi]
        let depot_a: Vec<usize> = candidates
            .iter()
            .filter(|c| c.depot == Depot::DepotA)
            .map(|c| c.index)
            .collect();
        let depot_b_count = candidates.iter().filter(|c| c.depot == Depot::DepotB).count();
        if !depot_a.is_empty() && depot_b_count > 0 {
            constraints.push(SoftConstraint {
                rule: SoftRule::DepotBalance,
                members: depot_a,
                lower: Some(cfg.depot_balance_lo),
                upper: Some(cfg.depot_balance_hi),
            });
        }

        // S2 车龄多样性: 新车候选达到下界数量时才纳入
        let new_members: Vec<usize> = candidates
            .iter()
            .filter(|c| c.is_new)
            .map(|c| c.index)
            .collect();
        if new_members.len() as i64 >= cfg.age_new_min {
            constraints.push(SoftConstraint {
                rule: SoftRule::AgeDiversity,
                members: new_members,
                lower: Some(cfg.age_new_min),
                upper: None,
            });
        }

        // S3 厂商多样性: 候选不少于下界的厂商各自设下界
        let mut by_vendor: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for c in candidates {
            by_vendor.entry(c.vendor.as_str()).or_default().push(c.index);
        }
        for (vendor, members) in by_vendor {
            if members.len() as i64 >= cfg.vendor_min {
                constraints.push(SoftConstraint {
                    rule: SoftRule::VendorDiversity(vendor.to_string()),
                    members,
                    lower: Some(cfg.vendor_min),
                    upper: None,
                });
            }
        }

        // S4 冠名紧迫: min(下界, 候选数)
        let critical: Vec<usize> = candidates
            .iter()
            .filter(|c| c.has_critical_branding)
            .map(|c| c.index)
            .collect();
        if !critical.is_empty() {
            let bound = cfg.critical_branding_min.min(critical.len() as i64);
            constraints.push(SoftConstraint {
                rule: SoftRule::BrandingUrgency,
                members: critical,
                lower: Some(bound),
                upper: None,
            });
        }

        // S5 走行均衡区间: min(下界, 候选数)
        let banded: Vec<usize> = candidates
            .iter()
            .filter(|c| c.in_mileage_band)
            .map(|c| c.index)
            .collect();
        if !banded.is_empty() {
            let bound = cfg.mileage_band_min.min(banded.len() as i64);
            constraints.push(SoftConstraint {
                rule: SoftRule::MileageBand,
                members: banded,
                lower: Some(bound),
                upper: None,
            });
        }

        // S6 归属股道偏好: min(下界, 候选数)
        let homed: Vec<usize> = candidates
            .iter()
            .filter(|c| c.home_bay_available)
            .map(|c| c.index)
            .collect();
        if !homed.is_empty() {
            let bound = cfg.home_bay_min.min(homed.len() as i64);
            constraints.push(SoftConstraint {
                rule: SoftRule::BayPreference,
                members: homed,
                lower: Some(bound),
                upper: None,
            });
        }

        constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{
        BrandingPriority, CertificateDomain, CertificateStatus, OperationalStatus,
    };
    use crate::domain::{
        BrandingCommitment, CertificateBook, FitnessCertificate, MileageRecord, Trainset,
    };
    use crate::domain::{DimensionScore, ScoreBreakdown};
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
    }

    fn flat_score(total: f64) -> Score {
        let breakdown = ScoreBreakdown {
            fitness: DimensionScore::value(total),
            job_card_load: DimensionScore::value(0.0),
            branding: DimensionScore::value(0.0),
            mileage: DimensionScore::value(0.0),
            component_wear: DimensionScore::value(0.0),
            cleaning: DimensionScore::value(0.0),
            stabling_access: DimensionScore::value(0.0),
        };
        Score { total, breakdown }
    }

    fn snapshot(id: i64, depot: Depot, vendor: &str, year: i32, km: i64) -> TrainsetSnapshot {
        let mut book = CertificateBook::default();
        for domain in CertificateDomain::ALL {
            *book.get_mut(domain) = FitnessCertificate {
                domain,
                valid_from: None,
                valid_to: Some(today() + Duration::days(120)),
                status: CertificateStatus::Valid,
            };
        }
        TrainsetSnapshot {
            trainset: Trainset {
                trainset_id: id,
                rake_number: format!("R{}", 1000 + id),
                vendor: vendor.to_string(),
                year_commissioned: year,
                home_depot: depot,
                status: OperationalStatus::InService,
            },
            certificates: book,
            job_cards: Vec::new(),
            branding: None,
            mileage: MileageRecord {
                total_km: km,
                ..MileageRecord::default()
            },
            cleaning_slots: Vec::new(),
        }
    }

    fn bay(id: i64, depot: Depot, position: i32) -> StablingBay {
        StablingBay {
            bay_id: id,
            depot,
            line: "Green Line".to_string(),
            position_order: position,
            occupied: false,
            blocked: false,
            currently_assigned_trainset: None,
        }
    }

    fn build_model(
        fleet: &[TrainsetSnapshot],
        bays: &[StablingBay],
        config: SchedulerConfig,
    ) -> RosterModel {
        let pool: Vec<PoolEntry> = (0..fleet.len())
            .map(|index| PoolEntry {
                index,
                tier: AdmissionTier::Strict,
            })
            .collect();
        let scores: Vec<Score> = fleet.iter().map(|_| flat_score(50.0)).collect();
        let home: Vec<bool> = fleet.iter().map(|_| true).collect();
        RosterModelBuilder::new(config).build(&pool, fleet, &scores, &home, bays, today())
    }

    #[test]
    fn test_depot_balance_omitted_for_single_depot() {
        let fleet: Vec<TrainsetSnapshot> = (0..6)
            .map(|i| snapshot(i, Depot::DepotA, "Alstom", 2024, 80_000))
            .collect();
        let bays = vec![bay(1, Depot::DepotA, 1)];
        let mut config = SchedulerConfig::default();
        config.roster_size = 4;
        let model = build_model(&fleet, &bays, config);
        assert!(!model
            .soft_constraints
            .iter()
            .any(|s| s.rule == SoftRule::DepotBalance));

        // 两段都有候选时才设段平衡
        let mut fleet = fleet;
        fleet.push(snapshot(99, Depot::DepotB, "Alstom", 2024, 80_000));
        let mut config = SchedulerConfig::default();
        config.roster_size = 4;
        let model = build_model(&fleet, &bays, config);
        let depot = model
            .soft_constraints
            .iter()
            .find(|s| s.rule == SoftRule::DepotBalance)
            .expect("depot balance present");
        assert_eq!(depot.lower, Some(9));
        assert_eq!(depot.upper, Some(15));
        assert_eq!(depot.members.len(), 6); // 仅 A 段成员
    }

    #[test]
    fn test_age_diversity_sufficiency_threshold() {
        // 7 辆新车: 不足 8, 约束省略
        let mut fleet: Vec<TrainsetSnapshot> = (0..7)
            .map(|i| snapshot(i, Depot::DepotA, "BEML", 2023, 80_000))
            .collect();
        for i in 7..12 {
            fleet.push(snapshot(i, Depot::DepotA, "BEML", 2010, 80_000));
        }
        let bays = vec![bay(1, Depot::DepotA, 1)];
        let model = build_model(&fleet, &bays, SchedulerConfig::default());
        assert!(!model
            .soft_constraints
            .iter()
            .any(|s| s.rule == SoftRule::AgeDiversity));

        // 第 8 辆新车出现后纳入
        fleet.push(snapshot(20, Depot::DepotA, "BEML", 2022, 80_000));
        let model = build_model(&fleet, &bays, SchedulerConfig::default());
        let age = model
            .soft_constraints
            .iter()
            .find(|s| s.rule == SoftRule::AgeDiversity)
            .expect("age diversity present");
        assert_eq!(age.lower, Some(8));
        assert_eq!(age.members.len(), 8);
    }

    #[test]
    fn test_branding_bound_clamps_to_pool_size() {
        let mut fleet: Vec<TrainsetSnapshot> = (0..10)
            .map(|i| snapshot(i, Depot::DepotA, "Alstom", 2024, 80_000))
            .collect();
        for i in 0..3 {
            fleet[i].branding = Some(BrandingCommitment {
                advertiser: "Airtel".to_string(),
                priority: BrandingPriority::Critical,
                target_exposure_hours: 500.0,
                achieved_exposure_hours: 100.0,
                campaign_start: Some(today() - Duration::days(5)),
                campaign_end: Some(today() + Duration::days(5)),
                has_penalty: true,
            });
        }
        let bays = vec![bay(1, Depot::DepotA, 1)];
        let model = build_model(&fleet, &bays, SchedulerConfig::default());
        let branding = model
            .soft_constraints
            .iter()
            .find(|s| s.rule == SoftRule::BrandingUrgency)
            .expect("branding urgency present");
        // min(6, 3) = 3
        assert_eq!(branding.lower, Some(3));
        assert_eq!(branding.members.len(), 3);
    }

    #[test]
    fn test_bay_bonus_values() {
        let fleet = vec![
            snapshot(1, Depot::DepotA, "Alstom", 2024, 80_000),
            snapshot(2, Depot::DepotB, "Alstom", 2024, 80_000),
        ];
        let bays = vec![bay(10, Depot::DepotA, 1), bay(11, Depot::DepotA, 4)];
        let mut config = SchedulerConfig::default();
        config.roster_size = 1;
        let model = build_model(&fleet, &bays, config);

        // N_max = 4; 股位 1 可达性 1.0, 股位 4 可达性 0.25
        assert_eq!(model.bay_bonus[0][0], 10); // 同段, 最前股位
        assert_eq!(model.bay_bonus[0][1], 3); // round(10 * 0.25)
        assert_eq!(model.bay_bonus[1][0], 5); // 异段减半
        assert_eq!(model.bay_bonus[1][1], 1); // round(10 * 0.25 * 0.5)
    }

    #[test]
    fn test_fallback_candidates_fixed_only_when_sufficient() {
        let fleet = vec![
            snapshot(1, Depot::DepotA, "Alstom", 2024, 80_000),
            snapshot(2, Depot::DepotA, "Alstom", 2024, 80_000),
            // 证书全部过期的兜底层候选
            {
                let mut s = snapshot(3, Depot::DepotA, "Alstom", 2024, 80_000);
                for domain in CertificateDomain::ALL {
                    s.certificates.get_mut(domain).status = CertificateStatus::Expired;
                }
                s
            },
        ];
        let scores: Vec<Score> = fleet.iter().map(|_| flat_score(50.0)).collect();
        let home = vec![true; 3];
        let bays = vec![bay(1, Depot::DepotA, 1), bay(2, Depot::DepotA, 2)];

        let pool = vec![
            PoolEntry { index: 0, tier: AdmissionTier::Strict },
            PoolEntry { index: 1, tier: AdmissionTier::Strict },
            PoolEntry { index: 2, tier: AdmissionTier::Fallback },
        ];

        // 严格候选 2 >= 目标 2: 兜底候选钉零
        let mut config = SchedulerConfig::default();
        config.roster_size = 2;
        let model = RosterModelBuilder::new(config)
            .build(&pool, &fleet, &scores, &home, &bays, today());
        assert!(model.candidates[2].fixed_zero);

        // 严格候选 2 < 目标 3: 闸门已证明必要性, 保持自由
        let mut config = SchedulerConfig::default();
        config.roster_size = 3;
        let model = RosterModelBuilder::new(config)
            .build(&pool, &fleet, &scores, &home, &bays, today());
        assert!(!model.candidates[2].fixed_zero);
    }

    #[test]
    fn test_variable_and_constraint_counts() {
        let fleet: Vec<TrainsetSnapshot> = (0..3)
            .map(|i| snapshot(i, Depot::DepotA, "Alstom", 2024, 80_000))
            .collect();
        let bays = vec![bay(1, Depot::DepotA, 1), bay(2, Depot::DepotA, 2)];
        let mut config = SchedulerConfig::default();
        config.roster_size = 2;
        let model = build_model(&fleet, &bays, config);
        assert_eq!(model.total_variables(), 3 + 3 * 2);
        // 1 (选数) + 3 (落股耦合) + 2 (股容量) + 0 (钉零)
        //   + mileage(1) + bay_preference(1); 厂商候选 3 < 4, 省略
        assert_eq!(model.total_constraints(), 8);
    }
}
