// ==========================================
// 地铁夜间编组排班系统 - 评分引擎
// ==========================================
// 红线: 纯函数, 无共享可变状态, 同输入同输出
// 职责: 六族信号融合为 [0,100] 综合优先级 + 维度明细
// 红线: 日期解析失败降级为维度保守中值, 不中断评分
// ==========================================

use crate::domain::types::{BrandingPriority, CleaningStatus, JobPriority, JobStatus};
use crate::domain::{DimensionScore, Score, ScoreBreakdown, TrainsetSnapshot};
use chrono::NaiveDate;
use std::cmp::Ordering;

// ===== 维度封顶 =====
// fitness 25 + job 20 + branding 15 + mileage 20 + wear 5 + cleaning 10 + stabling 5 = 100
const FITNESS_LONG: f64 = 8.33; // 余量 > 60 天
const FITNESS_MID: f64 = 6.67; // 余量 31-60 天
const FITNESS_SHORT: f64 = 4.17; // 余量 0-30 天
const FITNESS_PARSE_FALLBACK: f64 = 5.0;
const CLEANING_PARSE_FALLBACK: f64 = 1.0;
const BRANDING_PARSE_FALLBACK: f64 = 5.0;

// ==========================================
// ScoringEngine - 评分引擎
// ==========================================
pub struct ScoringEngine {
    mileage_band: (i64, i64),
}

impl ScoringEngine {
    pub fn new(mileage_band: (i64, i64)) -> Self {
        Self { mileage_band }
    }

    /// 单车综合评分
    ///
    /// # 参数
    /// - `snapshot`: 列车快照包
    /// - `home_bay_available`: 归属股道当夜是否可用 (由编排层从股道表推导)
    /// - `today`: 快照日期
    pub fn score(
        &self,
        snapshot: &TrainsetSnapshot,
        home_bay_available: bool,
        today: NaiveDate,
    ) -> Score {
        let breakdown = ScoreBreakdown {
            fitness: self.score_fitness(snapshot, today),
            job_card_load: self.score_job_cards(snapshot),
            branding: self.score_branding(snapshot, today),
            mileage: self.score_mileage(snapshot),
            component_wear: self.score_component_wear(snapshot),
            cleaning: self.score_cleaning(snapshot, today),
            stabling_access: self.score_stabling_access(home_bay_available),
        };
        Score {
            total: breakdown.dimension_sum(),
            breakdown,
        }
    }

    // ==========================================
    // 维度 1: 适运证书 (25)
    // ==========================================
    // 三域各计一档: >60 天 8.33, 31-60 天 6.67, 0-30 天 4.17, 无效 0
    fn score_fitness(&self, snapshot: &TrainsetSnapshot, today: NaiveDate) -> DimensionScore {
        let mut points = 0.0;
        for cert in snapshot.certificates.iter() {
            if cert.status != crate::domain::types::CertificateStatus::Valid {
                continue;
            }
            let Some(headroom) = cert.headroom_days(today) else {
                // 状态为 valid 但日期缺失: 整维降级为保守中值
                return DimensionScore::fallback(
                    FITNESS_PARSE_FALLBACK,
                    "certificate expiry date unparseable",
                );
            };
            if headroom < 0 {
                continue;
            }
            points += if headroom > 60 {
                FITNESS_LONG
            } else if headroom > 30 {
                FITNESS_MID
            } else {
                FITNESS_SHORT
            };
        }
        DimensionScore::value(points)
    }

    // ==========================================
    // 维度 2: 工单负荷 (20)
    // ==========================================
    // 满分起算: 开口紧急 -10, 开口高优 -5, 在修 -2, 下限 0
    fn score_job_cards(&self, snapshot: &TrainsetSnapshot) -> DimensionScore {
        let mut points: f64 = 20.0;
        for job in &snapshot.job_cards {
            match (job.status, job.priority) {
                (JobStatus::Open, JobPriority::Emergency) => points -= 10.0,
                (JobStatus::Open, JobPriority::High) => points -= 5.0,
                (JobStatus::InProgress, _) => points -= 2.0,
                _ => {}
            }
        }
        DimensionScore::value(points.max(0.0))
    }

    // ==========================================
    // 维度 3: 冠名曝光 (15)
    // ==========================================
    // 无活跃合约 3; 活跃 normal 5; 活跃 critical 按完成率 15/10/5
    fn score_branding(&self, snapshot: &TrainsetSnapshot, today: NaiveDate) -> DimensionScore {
        let Some(branding) = &snapshot.branding else {
            return DimensionScore::value(3.0);
        };

        let active = match branding.is_active(today) {
            Some(active) => active,
            None => {
                return DimensionScore::fallback(
                    BRANDING_PARSE_FALLBACK,
                    "campaign window unparseable",
                )
            }
        };
        if !active {
            return DimensionScore::value(3.0);
        }

        match branding.priority {
            BrandingPriority::Critical => {
                let points = match branding.exposure_ratio() {
                    Some(ratio) if ratio < 0.5 => 15.0,
                    Some(ratio) if ratio < 0.8 => 10.0,
                    _ => 5.0,
                };
                DimensionScore::value(points)
            }
            _ => DimensionScore::value(5.0),
        }
    }

    // ==========================================
    // 维度 4: 走行均衡 (20)
    // ==========================================
    // 区间内 20; 两侧缓冲带 15; 其余 10
    fn score_mileage(&self, snapshot: &TrainsetSnapshot) -> DimensionScore {
        let km = snapshot.mileage.total_km;
        let (lo, hi) = self.mileage_band;
        let points = if (lo..=hi).contains(&km) {
            20.0
        } else if (30_000..lo).contains(&km) || (km > hi && km <= 200_000) {
            15.0
        } else {
            10.0
        };
        DimensionScore::value(points)
    }

    // ==========================================
    // 维度 5: 部件磨耗 (5)
    // ==========================================
    fn score_component_wear(&self, snapshot: &TrainsetSnapshot) -> DimensionScore {
        let bogie = snapshot.mileage.bogie_condition;
        let points = if bogie >= 80 {
            5.0
        } else if bogie >= 60 {
            3.0
        } else {
            1.0
        };
        DimensionScore::value(points)
    }

    // ==========================================
    // 维度 6: 清洁时效 (10)
    // ==========================================
    // 已完成档期: 7 天内每次 5 分, 8-14 天每次 3 分, 封顶 10; 无近期清洁 1
    fn score_cleaning(&self, snapshot: &TrainsetSnapshot, today: NaiveDate) -> DimensionScore {
        let mut points: f64 = 0.0;
        for slot in &snapshot.cleaning_slots {
            if slot.status != CleaningStatus::Completed {
                continue;
            }
            let Some(slot_time) = slot.slot_time else {
                return DimensionScore::fallback(
                    CLEANING_PARSE_FALLBACK,
                    "cleaning slot date unparseable",
                );
            };
            let days_ago = (today - slot_time).num_days();
            if days_ago <= 7 {
                points += 5.0;
            } else if days_ago <= 14 {
                points += 3.0;
            }
        }
        if points == 0.0 {
            return DimensionScore::value(1.0);
        }
        DimensionScore::value(points.min(10.0))
    }

    // ==========================================
    // 维度 7: 股道可达 (5)
    // ==========================================
    fn score_stabling_access(&self, home_bay_available: bool) -> DimensionScore {
        DimensionScore::value(if home_bay_available { 5.0 } else { 2.0 })
    }
}

// ==========================================
// 并列裁定
// ==========================================

/// 优先级比较: 总分降序 -> 证书维降序 -> 走行公里升序 -> 车号升序
///
/// `Ordering::Less` 表示 a 优先于 b
pub fn compare_scored(
    a: (&Score, &TrainsetSnapshot),
    b: (&Score, &TrainsetSnapshot),
) -> Ordering {
    let (score_a, snap_a) = a;
    let (score_b, snap_b) = b;

    match score_b.total.total_cmp(&score_a.total) {
        Ordering::Equal => {}
        other => return other,
    }

    match score_b
        .breakdown
        .fitness
        .points()
        .total_cmp(&score_a.breakdown.fitness.points())
    {
        Ordering::Equal => {}
        other => return other,
    }

    match snap_a.mileage.total_km.cmp(&snap_b.mileage.total_km) {
        Ordering::Equal => {}
        other => return other,
    }

    snap_a.trainset_id().cmp(&snap_b.trainset_id())
}
