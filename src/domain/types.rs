// ==========================================
// 地铁夜间编组排班系统 - 领域类型定义
// ==========================================
// 红线: 枚举解析失败不报错, 统一降级为 Unknown
// 序列化格式: snake_case (与上游数据口径一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 运营状态 (Operational Status)
// ==========================================
// 上游存在两套口径: {ready, standby, maintenance} 与
// {in_service, standby, IBL_maintenance}, 在数据源边界统一归一化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalStatus {
    InService,   // 在役运营
    Standby,     // 备用
    Maintenance, // 检修 (不可上线)
    Unknown,     // 解析失败降级
}

impl OperationalStatus {
    /// 从上游标签归一化 (兼容两套口径)
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ready" | "in_service" => OperationalStatus::InService,
            "standby" => OperationalStatus::Standby,
            "maintenance" | "ibl_maintenance" => OperationalStatus::Maintenance,
            _ => OperationalStatus::Unknown,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            OperationalStatus::InService => "in_service",
            OperationalStatus::Standby => "standby",
            OperationalStatus::Maintenance => "maintenance",
            OperationalStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

// ==========================================
// 车辆段 (Home Depot)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depot {
    DepotA,
    DepotB,
    Unknown, // 解析失败降级, 不参与段平衡约束
}

impl Depot {
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "depot_a" | "depota" | "a" => Depot::DepotA,
            "depot_b" | "depotb" | "b" => Depot::DepotB,
            _ => Depot::Unknown,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Depot::DepotA => "Depot A",
            Depot::DepotB => "Depot B",
            Depot::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Depot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

// ==========================================
// 适运证书域 (Certificate Domain)
// ==========================================
// 不变量: 每列车每域恰有一张证书
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateDomain {
    RollingStock, // 车辆部
    Signalling,   // 信号部
    Telecom,      // 通信部
}

impl CertificateDomain {
    pub const ALL: [CertificateDomain; 3] = [
        CertificateDomain::RollingStock,
        CertificateDomain::Signalling,
        CertificateDomain::Telecom,
    ];

    pub fn as_label(&self) -> &'static str {
        match self {
            CertificateDomain::RollingStock => "rolling_stock",
            CertificateDomain::Signalling => "signalling",
            CertificateDomain::Telecom => "telecom",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "rolling_stock" => Some(CertificateDomain::RollingStock),
            "signalling" | "signaling" => Some(CertificateDomain::Signalling),
            "telecom" => Some(CertificateDomain::Telecom),
            _ => None,
        }
    }
}

impl fmt::Display for CertificateDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

// ==========================================
// 证书状态 (Certificate Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Valid,
    Expired,
    Suspended,
    Unknown, // 解析失败降级, 评分按无效处理
}

impl CertificateStatus {
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "valid" => CertificateStatus::Valid,
            "expired" => CertificateStatus::Expired,
            "suspended" => CertificateStatus::Suspended,
            _ => CertificateStatus::Unknown,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            CertificateStatus::Valid => "valid",
            CertificateStatus::Expired => "expired",
            CertificateStatus::Suspended => "suspended",
            CertificateStatus::Unknown => "unknown",
        }
    }
}

// ==========================================
// 工单优先级 / 工单状态 (Job Card)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Emergency, // 紧急工单, 阻断上线
    High,
    Medium,
    Low,
    Unknown,
}

impl JobPriority {
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "emergency" => JobPriority::Emergency,
            "high" => JobPriority::High,
            "medium" => JobPriority::Medium,
            "low" => JobPriority::Low,
            _ => JobPriority::Unknown,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            JobPriority::Emergency => "emergency",
            JobPriority::High => "high",
            JobPriority::Medium => "medium",
            JobPriority::Low => "low",
            JobPriority::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    InProgress,
    Closed,
    Unknown,
}

impl JobStatus {
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "open" => JobStatus::Open,
            "in_progress" => JobStatus::InProgress,
            "closed" => JobStatus::Closed,
            _ => JobStatus::Unknown,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::InProgress => "in_progress",
            JobStatus::Closed => "closed",
            JobStatus::Unknown => "unknown",
        }
    }
}

// ==========================================
// 广告冠名优先级 (Branding Priority)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrandingPriority {
    Critical, // 有违约罚则的关键合约
    Normal,
    Unknown, // 解析失败降级, 评分按 Normal 处理
}

impl BrandingPriority {
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" => BrandingPriority::Critical,
            "normal" => BrandingPriority::Normal,
            _ => BrandingPriority::Unknown,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            BrandingPriority::Critical => "critical",
            BrandingPriority::Normal => "normal",
            BrandingPriority::Unknown => "unknown",
        }
    }
}

// ==========================================
// 清洁类型 / 清洁状态 (Cleaning Slot)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningKind {
    Fumigation,
    Deep,
    Detailing,
    Trip,
    Unknown,
}

impl CleaningKind {
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fumigation" => CleaningKind::Fumigation,
            "deep" | "deep_cleaning" => CleaningKind::Deep,
            "detailing" => CleaningKind::Detailing,
            "trip" | "trip_cleaning" => CleaningKind::Trip,
            _ => CleaningKind::Unknown,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            CleaningKind::Fumigation => "fumigation",
            CleaningKind::Deep => "deep",
            CleaningKind::Detailing => "detailing",
            CleaningKind::Trip => "trip",
            CleaningKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStatus {
    Scheduled,
    InProgress,
    Completed,
    Unknown,
}

impl CleaningStatus {
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "scheduled" => CleaningStatus::Scheduled,
            "in_progress" => CleaningStatus::InProgress,
            "completed" => CleaningStatus::Completed,
            _ => CleaningStatus::Unknown,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            CleaningStatus::Scheduled => "scheduled",
            CleaningStatus::InProgress => "in_progress",
            CleaningStatus::Completed => "completed",
            CleaningStatus::Unknown => "unknown",
        }
    }
}

// ==========================================
// 准入层级 (Admission Tier)
// ==========================================
// 三级放宽漏斗: 严格 S -> 放宽 R -> 兜底 F
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionTier {
    Strict,
    Relaxed,
    Fallback,
}

impl fmt::Display for AdmissionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionTier::Strict => write!(f, "S"),
            AdmissionTier::Relaxed => write!(f, "R"),
            AdmissionTier::Fallback => write!(f, "F"),
        }
    }
}

// ==========================================
// 排班结果状态 (Roster Status)
// ==========================================
// 对外契约字符串: optimal / feasible / fallback_used / infeasible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterStatus {
    Optimal,
    Feasible,
    FallbackUsed,
    Infeasible,
}

impl fmt::Display for RosterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterStatus::Optimal => write!(f, "optimal"),
            RosterStatus::Feasible => write!(f, "feasible"),
            RosterStatus::FallbackUsed => write!(f, "fallback_used"),
            RosterStatus::Infeasible => write!(f, "infeasible"),
        }
    }
}

// ==========================================
// 求解状态 (Solve Status)
// ==========================================
// 求解适配层的裁决, 不等同于对外结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Timeout,
    Error,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Feasible => write!(f, "feasible"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::Timeout => write!(f, "timeout"),
            SolveStatus::Error => write!(f, "error"),
        }
    }
}
