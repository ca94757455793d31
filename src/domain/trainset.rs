// ==========================================
// 地铁夜间编组排班系统 - 列车领域模型
// ==========================================
// 红线: 所有实体为单次优化调用的只读快照
// 用途: 数据源层写入, 引擎层只读
// ==========================================

use crate::domain::types::{
    BrandingPriority, CertificateDomain, CertificateStatus, CleaningKind, CleaningStatus, Depot,
    JobPriority, JobStatus, OperationalStatus,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Trainset - 列车主数据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trainset {
    // ===== 主键 =====
    pub trainset_id: i64,    // 列车唯一标识
    pub rake_number: String, // 编组号 (人读编号, 如 R1024)

    // ===== 静态属性 =====
    pub vendor: String,         // 整车厂商
    pub year_commissioned: i32, // 投运年份
    pub home_depot: Depot,      // 归属车辆段

    // ===== 快照时刻可变属性 =====
    pub status: OperationalStatus, // 运营状态
}

// ==========================================
// FitnessCertificate - 适运证书
// ==========================================
// 日期解析失败保留 None, 由评分引擎保守降级
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessCertificate {
    pub domain: CertificateDomain,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub status: CertificateStatus,
}

impl FitnessCertificate {
    /// 未知域占位证书 (数据缺失时使用)
    pub fn unknown(domain: CertificateDomain) -> Self {
        Self {
            domain,
            valid_from: None,
            valid_to: None,
            status: CertificateStatus::Unknown,
        }
    }

    /// 证书在快照日是否有效: 状态为 valid 且有效期未过
    pub fn is_valid(&self, snapshot: NaiveDate) -> bool {
        self.status == CertificateStatus::Valid
            && self.valid_to.map(|d| d >= snapshot).unwrap_or(false)
    }

    /// 有效期余量 (天); 日期缺失返回 None
    pub fn headroom_days(&self, snapshot: NaiveDate) -> Option<i64> {
        self.valid_to.map(|d| (d - snapshot).num_days())
    }
}

// ==========================================
// CertificateBook - 三域证书集合
// ==========================================
// 不变量: 每域恰有一张证书, 以结构体字段固化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateBook {
    pub rolling_stock: FitnessCertificate,
    pub signalling: FitnessCertificate,
    pub telecom: FitnessCertificate,
}

impl Default for CertificateBook {
    fn default() -> Self {
        Self {
            rolling_stock: FitnessCertificate::unknown(CertificateDomain::RollingStock),
            signalling: FitnessCertificate::unknown(CertificateDomain::Signalling),
            telecom: FitnessCertificate::unknown(CertificateDomain::Telecom),
        }
    }
}

impl CertificateBook {
    pub fn iter(&self) -> [&FitnessCertificate; 3] {
        [&self.rolling_stock, &self.signalling, &self.telecom]
    }

    pub fn get_mut(&mut self, domain: CertificateDomain) -> &mut FitnessCertificate {
        match domain {
            CertificateDomain::RollingStock => &mut self.rolling_stock,
            CertificateDomain::Signalling => &mut self.signalling,
            CertificateDomain::Telecom => &mut self.telecom,
        }
    }

    /// 快照日有效证书数 (0..=3)
    pub fn valid_count(&self, snapshot: NaiveDate) -> usize {
        self.iter().iter().filter(|c| c.is_valid(snapshot)).count()
    }

    /// 三域最小有效期余量; 任一证书无效或日期缺失返回 None
    pub fn min_headroom_days(&self, snapshot: NaiveDate) -> Option<i64> {
        let mut min: Option<i64> = None;
        for cert in self.iter() {
            if !cert.is_valid(snapshot) {
                return None;
            }
            let days = cert.headroom_days(snapshot)?;
            min = Some(min.map_or(days, |m: i64| m.min(days)));
        }
        min
    }
}

// ==========================================
// JobCard - 维修工单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCard {
    pub jobcard_id: String,
    pub category: String, // 故障类别 (doors / bogie / HVAC ...)
    pub priority: JobPriority,
    pub status: JobStatus,
    pub created_on: Option<NaiveDate>,
    pub expected_completion: Option<NaiveDate>,
}

impl JobCard {
    pub fn is_open_emergency(&self) -> bool {
        self.status == JobStatus::Open && self.priority == JobPriority::Emergency
    }
}

// ==========================================
// BrandingCommitment - 广告冠名合约
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandingCommitment {
    pub advertiser: String,
    pub priority: BrandingPriority,
    pub target_exposure_hours: f64,
    pub achieved_exposure_hours: f64,
    pub campaign_start: Option<NaiveDate>,
    pub campaign_end: Option<NaiveDate>,
    pub has_penalty: bool,
}

impl BrandingCommitment {
    /// 快照日是否处于投放期; 日期缺失返回 None (解析失败, 上层保守降级)
    pub fn is_active(&self, snapshot: NaiveDate) -> Option<bool> {
        match (self.campaign_start, self.campaign_end) {
            (Some(start), Some(end)) => Some(start <= snapshot && snapshot <= end),
            _ => None,
        }
    }

    /// 曝光完成率 achieved/target; 目标为零或负返回 None
    pub fn exposure_ratio(&self) -> Option<f64> {
        if self.target_exposure_hours > 0.0 {
            Some(self.achieved_exposure_hours / self.target_exposure_hours)
        } else {
            None
        }
    }

    /// 曝光缺口 (可为负, 表示超额完成)
    pub fn exposure_deficit(&self) -> f64 {
        self.target_exposure_hours - self.achieved_exposure_hours
    }
}

// ==========================================
// MileageRecord - 走行公里与部件磨耗
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MileageRecord {
    pub total_km: i64,
    pub km_since_poh: i64,              // 架修后走行
    pub km_since_ioh: i64,              // 定修后走行
    pub km_since_trip_maintenance: i64, // 列检后走行
    pub bogie_condition: i32,           // 转向架状态指数 0-100
    pub brake_wear: i32,                // 闸片磨耗 0-100
    pub hvac_hours: i64,                // 空调运行小时
    pub updated_at: Option<NaiveDate>,
}

impl Default for MileageRecord {
    fn default() -> Self {
        // 数据缺失时的保守快照: 零走行, 低状态指数
        Self {
            total_km: 0,
            km_since_poh: 0,
            km_since_ioh: 0,
            km_since_trip_maintenance: 0,
            bogie_condition: 0,
            brake_wear: 0,
            hvac_hours: 0,
            updated_at: None,
        }
    }
}

// ==========================================
// CleaningSlot - 清洁档期
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningSlot {
    pub cleaning_id: String,
    pub kind: CleaningKind,
    pub status: CleaningStatus,
    pub slot_time: Option<NaiveDate>,
    pub bay_number: Option<i32>,
    pub staff: Option<String>,
}

// ==========================================
// TrainsetSnapshot - 单车快照包
// ==========================================
// 一列车及其全部关联记录, 引擎层的唯一输入单元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainsetSnapshot {
    pub trainset: Trainset,
    pub certificates: CertificateBook,
    pub job_cards: Vec<JobCard>,
    pub branding: Option<BrandingCommitment>,
    pub mileage: MileageRecord,
    pub cleaning_slots: Vec<CleaningSlot>,
}

impl TrainsetSnapshot {
    pub fn trainset_id(&self) -> i64 {
        self.trainset.trainset_id
    }

    pub fn has_open_emergency_job(&self) -> bool {
        self.job_cards.iter().any(|j| j.is_open_emergency())
    }

    pub fn valid_certificate_count(&self, snapshot: NaiveDate) -> usize {
        self.certificates.valid_count(snapshot)
    }

    /// 快照日是否承载活跃的 critical 冠名合约
    pub fn has_active_critical_branding(&self, snapshot: NaiveDate) -> bool {
        self.branding
            .as_ref()
            .map(|b| {
                b.priority == BrandingPriority::Critical
                    && b.is_active(snapshot).unwrap_or(false)
            })
            .unwrap_or(false)
    }
}
