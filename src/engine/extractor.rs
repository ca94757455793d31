// ==========================================
// 地铁夜间编组排班系统 - 解提取器
// ==========================================
// 职责: 将变量赋值投影为名单 (入选 + 落选 + 理由)
// 红线: 落选理由按固定优先级择首, 措辞是对外契约
// 兜底路径: 求解失败时按分数贪心取前 N 并贪心落股
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::types::{AdmissionTier, Depot, OperationalStatus};
use crate::domain::{
    RejectedEntry, Roster, Score, SelectedEntry, TrainCompliance, TrainsetSnapshot,
};
use crate::engine::model::RosterModel;
use crate::engine::scoring::compare_scored;
use crate::engine::solver::SolveOutcome;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// 低分落选阈值
const SCORE_THRESHOLD: f64 = 30.0;

// ===== 落选理由 (对外契约措辞) =====
const REASON_MAINTENANCE: &str = "under maintenance — excluded from scheduling";
const REASON_INVALID_CERTS: &str = "invalid fitness certificates";
const REASON_EMERGENCY: &str = "emergency work order open";
const REASON_NOT_SELECTED: &str = "not selected by optimisation";

// ==========================================
// ExtractionContext - 提取所需的车队视图
// ==========================================
// 四个切片与编排层快照数组下标对齐
pub struct ExtractionContext<'a> {
    pub fleet: &'a [TrainsetSnapshot],
    pub scores: &'a [Score],
    pub tiers: &'a [Option<AdmissionTier>],
    pub home_available: &'a [bool],
    pub today: NaiveDate,
}

// ==========================================
// SolutionExtractor - 解提取器
// ==========================================
pub struct SolutionExtractor {
    config: SchedulerConfig,
}

impl SolutionExtractor {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// 从求解器赋值提取名单
    pub fn extract(
        &self,
        ctx: &ExtractionContext<'_>,
        model: &RosterModel,
        outcome: &SolveOutcome,
    ) -> Roster {
        let selected_candidates: Vec<usize> = model
            .candidates
            .iter()
            .filter(|c| outcome.selection.get(c.index).copied().unwrap_or(false))
            .map(|c| c.index)
            .collect();

        let assignment =
            self.canonicalise_assignment(ctx, model, &selected_candidates, &outcome.assignment);

        self.assemble(ctx, model, &selected_candidates, &assignment)
    }

    /// 兜底路径: 贪心前 N + 贪心落股
    ///
    /// 保持硬约束语义: 恰取 N 车, 每车一股, 每股一车。
    /// 返回 (名单, 按整数系数复算的目标值)。
    pub fn fallback(
        &self,
        ctx: &ExtractionContext<'_>,
        model: &RosterModel,
    ) -> (Roster, f64) {
        let mut order: Vec<usize> = model
            .candidates
            .iter()
            .filter(|c| !c.fixed_zero)
            .map(|c| c.index)
            .collect();
        order.sort_by(|&a, &b| {
            let fa = model.candidates[a].fleet_index;
            let fb = model.candidates[b].fleet_index;
            compare_scored(
                (&ctx.scores[fa], &ctx.fleet[fa]),
                (&ctx.scores[fb], &ctx.fleet[fb]),
            )
        });
        order.truncate(self.config.roster_size);

        // 分数序逐车取奖励最大的可用股道; 并列取股位小者, 再取股号小者
        let mut taken: HashSet<usize> = HashSet::new();
        let mut assignment: HashMap<usize, usize> = HashMap::new();
        for &t in &order {
            let best = model
                .bays
                .iter()
                .filter(|bay| !taken.contains(&bay.index))
                .max_by(|x, y| {
                    let bx = model.bay_bonus[t][x.index];
                    let by = model.bay_bonus[t][y.index];
                    bx.cmp(&by)
                        .then(y.position_order.cmp(&x.position_order))
                        .then(y.bay_id.cmp(&x.bay_id))
                });
            if let Some(bay) = best {
                taken.insert(bay.index);
                assignment.insert(t, bay.index);
            }
        }

        let mut objective = 0i64;
        for &t in &order {
            objective += model.candidates[t].score_int;
            if let Some(&b) = assignment.get(&t) {
                objective += model.bay_bonus[t][b];
            }
        }

        debug!(selected = order.len(), objective, "兜底贪心投影完成");
        (self.assemble(ctx, model, &order, &assignment), objective as f64)
    }

    /// 全员落选投影 (不可行 / 取消路径)
    pub fn reject_all(&self, ctx: &ExtractionContext<'_>) -> Vec<RejectedEntry> {
        let mut rejected: Vec<RejectedEntry> = ctx
            .fleet
            .iter()
            .enumerate()
            .map(|(fleet_index, snapshot)| {
                let score = &ctx.scores[fleet_index];
                RejectedEntry {
                    trainset_id: snapshot.trainset_id(),
                    rake_number: snapshot.trainset.rake_number.clone(),
                    status: snapshot.trainset.status,
                    vendor: snapshot.trainset.vendor.clone(),
                    year_commissioned: snapshot.trainset.year_commissioned,
                    home_depot: snapshot.trainset.home_depot,
                    score: score.display_total(),
                    tier: ctx.tiers[fleet_index],
                    exclusion_reason: self.exclusion_reason(ctx, snapshot, score),
                    compliance: self.train_compliance(ctx, fleet_index),
                }
            })
            .collect();
        let fleet_by_id: HashMap<i64, usize> = ctx
            .fleet
            .iter()
            .enumerate()
            .map(|(i, s)| (s.trainset_id(), i))
            .collect();
        rejected.sort_by(|a, b| {
            let fa = fleet_by_id[&a.trainset_id];
            let fb = fleet_by_id[&b.trainset_id];
            compare_scored(
                (&ctx.scores[fa], &ctx.fleet[fa]),
                (&ctx.scores[fb], &ctx.fleet[fb]),
            )
        });
        rejected
    }

    // ==========================================
    // 落股归一化
    // ==========================================
    // 同段候选对所有股道的奖励相同, 解算器在其间的排列是任意的;
    // 组内按优先级序配最靠前的股道, 目标值不变且与输入顺序无关
    fn canonicalise_assignment(
        &self,
        ctx: &ExtractionContext<'_>,
        model: &RosterModel,
        selected: &[usize],
        raw: &[Option<usize>],
    ) -> HashMap<usize, usize> {
        let mut groups: BTreeMap<u8, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
        for &t in selected {
            let Some(bay) = raw.get(t).copied().flatten() else {
                continue;
            };
            let key = depot_rank(model.candidates[t].depot);
            let entry = groups.entry(key).or_default();
            entry.0.push(t);
            entry.1.push(bay);
        }

        let mut assignment = HashMap::new();
        for (_, (mut members, mut bays)) in groups {
            members.sort_by(|&a, &b| {
                let fa = model.candidates[a].fleet_index;
                let fb = model.candidates[b].fleet_index;
                compare_scored(
                    (&ctx.scores[fa], &ctx.fleet[fa]),
                    (&ctx.scores[fb], &ctx.fleet[fb]),
                )
            });
            bays.sort_by(|&x, &y| {
                let bx = &model.bays[x];
                let by = &model.bays[y];
                bx.position_order
                    .cmp(&by.position_order)
                    .then(bx.bay_id.cmp(&by.bay_id))
            });
            for (t, b) in members.into_iter().zip(bays.into_iter()) {
                assignment.insert(t, b);
            }
        }
        assignment
    }

    // ==========================================
    // 名单装配
    // ==========================================
    fn assemble(
        &self,
        ctx: &ExtractionContext<'_>,
        model: &RosterModel,
        selected: &[usize],
        assignment: &HashMap<usize, usize>,
    ) -> Roster {
        let selected_fleet: HashSet<usize> = selected
            .iter()
            .map(|&t| model.candidates[t].fleet_index)
            .collect();

        let mut roster = Roster::default();

        for &t in selected {
            let candidate = &model.candidates[t];
            let fleet_index = candidate.fleet_index;
            let snapshot = &ctx.fleet[fleet_index];
            let score = &ctx.scores[fleet_index];
            let bay_id = assignment
                .get(&t)
                .map(|&b| model.bays[b].bay_id)
                .unwrap_or(-1);

            roster.selected.push(SelectedEntry {
                trainset_id: snapshot.trainset_id(),
                rake_number: snapshot.trainset.rake_number.clone(),
                status: snapshot.trainset.status,
                vendor: snapshot.trainset.vendor.clone(),
                year_commissioned: snapshot.trainset.year_commissioned,
                home_depot: snapshot.trainset.home_depot,
                score: score.display_total(),
                breakdown: score.breakdown.clone(),
                bay_id,
                tier: candidate.tier,
                reasons: self.selection_reasons(ctx, snapshot, score),
                compliance: self.train_compliance(ctx, fleet_index),
            });
        }

        for (fleet_index, snapshot) in ctx.fleet.iter().enumerate() {
            if selected_fleet.contains(&fleet_index) {
                continue;
            }
            let score = &ctx.scores[fleet_index];
            roster.rejected.push(RejectedEntry {
                trainset_id: snapshot.trainset_id(),
                rake_number: snapshot.trainset.rake_number.clone(),
                status: snapshot.trainset.status,
                vendor: snapshot.trainset.vendor.clone(),
                year_commissioned: snapshot.trainset.year_commissioned,
                home_depot: snapshot.trainset.home_depot,
                score: score.display_total(),
                tier: ctx.tiers[fleet_index],
                exclusion_reason: self.exclusion_reason(ctx, snapshot, score),
                compliance: self.train_compliance(ctx, fleet_index),
            });
        }

        // 两个名单均按总分降序, 并列按统一裁定
        let fleet_by_id: HashMap<i64, usize> = ctx
            .fleet
            .iter()
            .enumerate()
            .map(|(i, s)| (s.trainset_id(), i))
            .collect();
        roster.selected.sort_by(|a, b| {
            let fa = fleet_by_id[&a.trainset_id];
            let fb = fleet_by_id[&b.trainset_id];
            compare_scored(
                (&ctx.scores[fa], &ctx.fleet[fa]),
                (&ctx.scores[fb], &ctx.fleet[fb]),
            )
        });
        roster.rejected.sort_by(|a, b| {
            let fa = fleet_by_id[&a.trainset_id];
            let fb = fleet_by_id[&b.trainset_id];
            compare_scored(
                (&ctx.scores[fa], &ctx.fleet[fa]),
                (&ctx.scores[fb], &ctx.fleet[fb]),
            )
        });

        roster
    }

    /// 入选理由: 按优先级拼接全部命中的句子
    fn selection_reasons(
        &self,
        ctx: &ExtractionContext<'_>,
        snapshot: &TrainsetSnapshot,
        score: &Score,
    ) -> Vec<String> {
        let mut reasons = Vec::new();

        if snapshot.has_active_critical_branding(ctx.today) {
            let behind = snapshot
                .branding
                .as_ref()
                .and_then(|b| b.exposure_ratio())
                .map(|r| r < 0.5)
                .unwrap_or(false);
            if behind {
                reasons.push("urgent critical branding".to_string());
            }
        }

        if let Some(headroom) = snapshot.certificates.min_headroom_days(ctx.today) {
            if headroom >= 60 {
                reasons.push("long-term fitness headroom".to_string());
            }
        }

        if score.breakdown.mileage.points() >= 18.0 {
            reasons.push("needs mileage balancing".to_string());
        }

        if score.breakdown.cleaning.points() == 10.0 {
            reasons.push("recently cleaned".to_string());
        }

        if reasons.is_empty() {
            reasons.push("optimal multi-criteria fit".to_string());
        }
        reasons
    }

    /// 落选理由: 择首条命中
    fn exclusion_reason(
        &self,
        ctx: &ExtractionContext<'_>,
        snapshot: &TrainsetSnapshot,
        score: &Score,
    ) -> String {
        if snapshot.trainset.status == OperationalStatus::Maintenance {
            return REASON_MAINTENANCE.to_string();
        }
        if snapshot.valid_certificate_count(ctx.today) == 0 {
            return REASON_INVALID_CERTS.to_string();
        }
        if snapshot.has_open_emergency_job() {
            return REASON_EMERGENCY.to_string();
        }
        if score.total < SCORE_THRESHOLD {
            return format!("score below threshold ({:.1})", score.display_total());
        }
        REASON_NOT_SELECTED.to_string()
    }

    fn train_compliance(&self, ctx: &ExtractionContext<'_>, fleet_index: usize) -> TrainCompliance {
        let snapshot = &ctx.fleet[fleet_index];
        let (lo, hi) = self.config.mileage_band;
        TrainCompliance::new(
            snapshot.valid_certificate_count(ctx.today) == 3,
            !snapshot.has_open_emergency_job(),
            snapshot.trainset.status != OperationalStatus::Maintenance,
            (lo..=hi).contains(&snapshot.mileage.total_km),
            ctx.home_available[fleet_index],
        )
    }
}

fn depot_rank(depot: Depot) -> u8 {
    match depot {
        Depot::DepotA => 0,
        Depot::DepotB => 1,
        Depot::Unknown => 2,
    }
}
