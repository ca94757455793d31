// ==========================================
// 地铁夜间编组排班系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + MILP
// 系统定位: 夜间上线决策支持 (人工最终控制权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据源层 - 车队快照访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施 (连接初始化/PRAGMA 统一)
pub mod db;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AdmissionTier, BrandingPriority, CertificateDomain, CertificateStatus, CleaningKind,
    CleaningStatus, Depot, JobPriority, JobStatus, OperationalStatus, RosterStatus, SolveStatus,
};

// 领域实体
pub use domain::{
    BrandingCommitment, CertificateBook, CleaningSlot, ComplianceReport, FitnessCertificate,
    JobCard, MileageRecord, OptimiseRequest, OptimiseResult, RejectedEntry, Roster, Score,
    ScoreBreakdown, SelectedEntry, SolverStats, StablingBay, Trainset, TrainsetSnapshot,
    Violation,
};

// 引擎
pub use engine::{
    CancelFlag, ComplianceReporter, EligibilityGate, InductionReport, InductionScheduler,
    MilpRosterSolver, RosterModelBuilder, RosterSolver, ScheduleError, ScoringEngine,
    SolutionExtractor,
};

// 配置与数据源
pub use config::{ConfigManager, SchedulerConfig, SchedulerConfigReader};
pub use repository::{demo_fleet, FleetDataSource, InMemoryFleet, SqliteFleetSource};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "地铁夜间编组排班系统";
