// ==========================================
// 地铁夜间编组排班系统 - 适役准入闸门
// ==========================================
// 职责: 三级放宽漏斗, 决定进入优化池的列车
// 红线: 检修状态列车在本闸门永不准入
// 红线: 逐层放宽必须整层并入, 与输入顺序无关
// ==========================================

use crate::domain::types::{AdmissionTier, OperationalStatus};
use crate::domain::TrainsetSnapshot;
use crate::engine::error::ScheduleError;
use chrono::NaiveDate;
use tracing::{debug, info};

// ==========================================
// PoolEntry - 入池记录
// ==========================================
// index 指向编排层的车队快照数组; tier 为准入层级注记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolEntry {
    pub index: usize,
    pub tier: AdmissionTier,
}

// ==========================================
// EligibilityGate - 准入闸门
// ==========================================
pub struct EligibilityGate {
    enable_relaxation: bool, // false 时兜底层 F 永不进入
}

impl EligibilityGate {
    pub fn new(enable_relaxation: bool) -> Self {
        Self { enable_relaxation }
    }

    /// 单车准入层级判定
    ///
    /// 返回该车可达的最高 (最严格) 层级:
    /// - S: >=2 张有效证书, 无开口紧急工单, 非检修
    /// - R: >=1 张有效证书, 无开口紧急工单, 非检修
    /// - F: 非检修即可 (含状态解析失败的车)
    /// - None: 检修, 永不准入
    pub fn classify(&self, snapshot: &TrainsetSnapshot, today: NaiveDate) -> Option<AdmissionTier> {
        match snapshot.trainset.status {
            OperationalStatus::Maintenance => return None,
            OperationalStatus::Unknown => return Some(AdmissionTier::Fallback),
            OperationalStatus::InService | OperationalStatus::Standby => {}
        }

        if snapshot.has_open_emergency_job() {
            return Some(AdmissionTier::Fallback);
        }

        match snapshot.valid_certificate_count(today) {
            n if n >= 2 => Some(AdmissionTier::Strict),
            1 => Some(AdmissionTier::Relaxed),
            _ => Some(AdmissionTier::Fallback),
        }
    }

    /// 构建优化池
    ///
    /// 从 S 层起步; 池规模不足目标时整层并入下一层级。
    /// 兜底层之后仍不足则返回 InsufficientFleet。
    pub fn build_pool(
        &self,
        fleet: &[TrainsetSnapshot],
        today: NaiveDate,
        roster_size: usize,
    ) -> Result<Vec<PoolEntry>, ScheduleError> {
        let mut strict = Vec::new();
        let mut relaxed = Vec::new();
        let mut fallback = Vec::new();

        for (index, snapshot) in fleet.iter().enumerate() {
            match self.classify(snapshot, today) {
                Some(AdmissionTier::Strict) => strict.push(index),
                Some(AdmissionTier::Relaxed) => relaxed.push(index),
                Some(AdmissionTier::Fallback) => fallback.push(index),
                None => {}
            }
        }

        debug!(
            strict = strict.len(),
            relaxed = relaxed.len(),
            fallback = fallback.len(),
            "准入分层完成"
        );

        let mut pool: Vec<PoolEntry> = strict
            .iter()
            .map(|&index| PoolEntry {
                index,
                tier: AdmissionTier::Strict,
            })
            .collect();

        if pool.len() < roster_size {
            info!(
                strict = pool.len(),
                roster_size, "严格层不足, 并入放宽层"
            );
            pool.extend(relaxed.iter().map(|&index| PoolEntry {
                index,
                tier: AdmissionTier::Relaxed,
            }));
        }

        if pool.len() < roster_size && self.enable_relaxation {
            info!(
                pool = pool.len(),
                roster_size, "放宽层仍不足, 并入兜底层"
            );
            pool.extend(fallback.iter().map(|&index| PoolEntry {
                index,
                tier: AdmissionTier::Fallback,
            }));
        }

        if pool.len() < roster_size {
            return Err(ScheduleError::InsufficientFleet {
                need: roster_size,
                have: pool.len(),
            });
        }

        Ok(pool)
    }
}
