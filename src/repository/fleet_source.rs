// ==========================================
// 地铁夜间编组排班系统 - 车队数据源契约
// ==========================================
// 红线: 引擎层只经由本 trait 取数, 不拼 SQL
// 实现方可以是数据库 / 文件 / 测试夹具
// ==========================================

use crate::domain::{
    BrandingCommitment, CertificateBook, CleaningSlot, JobCard, MileageRecord, StablingBay,
    Trainset,
};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::HashMap;

// ==========================================
// FleetDataSource - 车队快照数据源
// ==========================================
// 返回数据在单次优化调用期间视为不可变
#[async_trait]
pub trait FleetDataSource: Send + Sync {
    async fn trainsets(&self) -> RepositoryResult<Vec<Trainset>>;

    async fn fitness_certificates(
        &self,
        ids: &[i64],
    ) -> RepositoryResult<HashMap<i64, CertificateBook>>;

    async fn job_cards(&self, ids: &[i64]) -> RepositoryResult<HashMap<i64, Vec<JobCard>>>;

    async fn branding_commitments(
        &self,
        ids: &[i64],
    ) -> RepositoryResult<HashMap<i64, BrandingCommitment>>;

    async fn mileage_records(&self, ids: &[i64])
        -> RepositoryResult<HashMap<i64, MileageRecord>>;

    async fn cleaning_slots(&self, ids: &[i64])
        -> RepositoryResult<HashMap<i64, Vec<CleaningSlot>>>;

    async fn bays(&self) -> RepositoryResult<Vec<StablingBay>>;
}
