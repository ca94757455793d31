// ==========================================
// 地铁夜间编组排班系统 - 数据源层
// ==========================================
// 职责: 车队快照数据访问, 枚举/日期在边界归一化
// ==========================================

pub mod error;
pub mod fixture;
pub mod fleet_source;
pub mod sqlite_fleet;

pub use error::{RepositoryError, RepositoryResult};
pub use fixture::{demo_fleet, InMemoryFleet};
pub use fleet_source::FleetDataSource;
pub use sqlite_fleet::SqliteFleetSource;
