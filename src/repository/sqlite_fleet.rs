// ==========================================
// 地铁夜间编组排班系统 - SQLite 车队数据源
// ==========================================
// 职责: 七类实体的建表 / 写入 / 读取
// 红线: 枚举与日期解析失败在本层降级, 不向引擎层抛错
// ==========================================

use crate::db;
use crate::domain::types::{
    BrandingPriority, CertificateDomain, CertificateStatus, CleaningKind, CleaningStatus, Depot,
    JobPriority, JobStatus, OperationalStatus,
};
use crate::domain::{
    BrandingCommitment, CertificateBook, CleaningSlot, FitnessCertificate, JobCard, MileageRecord,
    StablingBay, Trainset,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::fixture::InMemoryFleet;
use crate::repository::fleet_source::FleetDataSource;
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS trainset (
    trainset_id         INTEGER PRIMARY KEY,
    rake_number         TEXT NOT NULL,
    vendor              TEXT NOT NULL,
    year_commissioned   INTEGER NOT NULL,
    home_depot          TEXT NOT NULL,
    status              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fitness_certificate (
    trainset_id         INTEGER NOT NULL,
    domain              TEXT NOT NULL,
    valid_from          TEXT,
    valid_to            TEXT,
    status              TEXT NOT NULL,
    PRIMARY KEY (trainset_id, domain)
);

CREATE TABLE IF NOT EXISTS job_card (
    jobcard_id          TEXT PRIMARY KEY,
    trainset_id         INTEGER NOT NULL,
    category            TEXT NOT NULL,
    priority            TEXT NOT NULL,
    status              TEXT NOT NULL,
    created_on          TEXT,
    expected_completion TEXT
);

CREATE TABLE IF NOT EXISTS branding_commitment (
    trainset_id             INTEGER PRIMARY KEY,
    advertiser              TEXT NOT NULL,
    priority                TEXT NOT NULL,
    target_exposure_hours   REAL NOT NULL,
    achieved_exposure_hours REAL NOT NULL,
    campaign_start          TEXT,
    campaign_end            TEXT,
    has_penalty             INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS mileage_record (
    trainset_id               INTEGER PRIMARY KEY,
    total_km                  INTEGER NOT NULL,
    km_since_poh              INTEGER NOT NULL,
    km_since_ioh              INTEGER NOT NULL,
    km_since_trip_maintenance INTEGER NOT NULL,
    bogie_condition           INTEGER NOT NULL,
    brake_wear                INTEGER NOT NULL,
    hvac_hours                INTEGER NOT NULL,
    updated_at                TEXT
);

CREATE TABLE IF NOT EXISTS cleaning_slot (
    cleaning_id  TEXT PRIMARY KEY,
    trainset_id  INTEGER NOT NULL,
    kind         TEXT NOT NULL,
    status       TEXT NOT NULL,
    slot_time    TEXT,
    bay_number   INTEGER,
    staff        TEXT
);

CREATE TABLE IF NOT EXISTS stabling_bay (
    bay_id                      INTEGER PRIMARY KEY,
    depot                       TEXT NOT NULL,
    line                        TEXT NOT NULL,
    position_order              INTEGER NOT NULL,
    occupied                    INTEGER NOT NULL DEFAULT 0,
    blocked                     INTEGER NOT NULL DEFAULT 0,
    currently_assigned_trainset INTEGER
);
"#;

/// 日期列归一化: 非法格式降级为 None, 由评分引擎保守处理
fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

// ==========================================
// SqliteFleetSource - SQLite 车队数据源
// ==========================================
pub struct SqliteFleetSource {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFleetSource {
    /// 打开数据库文件并确保建表
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let mut conn = db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        crate::perf::install_sqlite_tracing(&mut conn);
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 内存库 (测试用)
    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        db::configure_sqlite_connection(&conn)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 (会再次应用统一 PRAGMA 并确保建表, 幂等)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            db::configure_sqlite_connection(&guard)
                .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
            guard.execute_batch(SCHEMA_SQL)?;
        }
        Ok(Self { conn })
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入 (导入 / 测试播种)
    // ==========================================

    pub fn save_trainset(&self, t: &Trainset) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO trainset
             (trainset_id, rake_number, vendor, year_commissioned, home_depot, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                t.trainset_id,
                t.rake_number,
                t.vendor,
                t.year_commissioned,
                t.home_depot.as_label(),
                t.status.as_label(),
            ],
        )?;
        Ok(())
    }

    pub fn save_certificate(
        &self,
        trainset_id: i64,
        cert: &FitnessCertificate,
    ) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO fitness_certificate
             (trainset_id, domain, valid_from, valid_to, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                trainset_id,
                cert.domain.as_label(),
                cert.valid_from.map(|d| d.to_string()),
                cert.valid_to.map(|d| d.to_string()),
                cert.status.as_label(),
            ],
        )?;
        Ok(())
    }

    pub fn save_job_card(&self, trainset_id: i64, card: &JobCard) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO job_card
             (jobcard_id, trainset_id, category, priority, status, created_on, expected_completion)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                card.jobcard_id,
                trainset_id,
                card.category,
                card.priority.as_label(),
                card.status.as_label(),
                card.created_on.map(|d| d.to_string()),
                card.expected_completion.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn save_branding(
        &self,
        trainset_id: i64,
        commitment: &BrandingCommitment,
    ) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO branding_commitment
             (trainset_id, advertiser, priority, target_exposure_hours, achieved_exposure_hours,
              campaign_start, campaign_end, has_penalty)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                trainset_id,
                commitment.advertiser,
                commitment.priority.as_label(),
                commitment.target_exposure_hours,
                commitment.achieved_exposure_hours,
                commitment.campaign_start.map(|d| d.to_string()),
                commitment.campaign_end.map(|d| d.to_string()),
                commitment.has_penalty as i64,
            ],
        )?;
        Ok(())
    }

    pub fn save_mileage(&self, trainset_id: i64, record: &MileageRecord) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO mileage_record
             (trainset_id, total_km, km_since_poh, km_since_ioh, km_since_trip_maintenance,
              bogie_condition, brake_wear, hvac_hours, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                trainset_id,
                record.total_km,
                record.km_since_poh,
                record.km_since_ioh,
                record.km_since_trip_maintenance,
                record.bogie_condition,
                record.brake_wear,
                record.hvac_hours,
                record.updated_at.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn save_cleaning_slot(
        &self,
        trainset_id: i64,
        slot: &CleaningSlot,
    ) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO cleaning_slot
             (cleaning_id, trainset_id, kind, status, slot_time, bay_number, staff)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                slot.cleaning_id,
                trainset_id,
                slot.kind.as_label(),
                slot.status.as_label(),
                slot.slot_time.map(|d| d.to_string()),
                slot.bay_number,
                slot.staff,
            ],
        )?;
        Ok(())
    }

    pub fn save_bay(&self, bay: &StablingBay) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO stabling_bay
             (bay_id, depot, line, position_order, occupied, blocked, currently_assigned_trainset)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                bay.bay_id,
                bay.depot.as_label(),
                bay.line,
                bay.position_order,
                bay.occupied as i64,
                bay.blocked as i64,
                bay.currently_assigned_trainset,
            ],
        )?;
        Ok(())
    }

    /// 整体播种: 将内存车队写入数据库 (演示与测试)
    pub fn seed(&self, fleet: &InMemoryFleet) -> RepositoryResult<()> {
        for t in &fleet.trainsets {
            self.save_trainset(t)?;
        }
        for (id, book) in &fleet.certificates {
            for cert in book.iter() {
                self.save_certificate(*id, cert)?;
            }
        }
        for (id, cards) in &fleet.job_cards {
            for card in cards {
                self.save_job_card(*id, card)?;
            }
        }
        for (id, commitment) in &fleet.branding {
            self.save_branding(*id, commitment)?;
        }
        for (id, record) in &fleet.mileage {
            self.save_mileage(*id, record)?;
        }
        for (id, slots) in &fleet.cleaning {
            for slot in slots {
                self.save_cleaning_slot(*id, slot)?;
            }
        }
        for bay in &fleet.bays {
            self.save_bay(bay)?;
        }
        Ok(())
    }

    fn in_clause(ids: &[i64]) -> String {
        vec!["?"; ids.len()].join(",")
    }
}

#[async_trait]
impl FleetDataSource for SqliteFleetSource {
    async fn trainsets(&self) -> RepositoryResult<Vec<Trainset>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT trainset_id, rake_number, vendor, year_commissioned, home_depot, status
             FROM trainset ORDER BY trainset_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Trainset {
                trainset_id: row.get(0)?,
                rake_number: row.get(1)?,
                vendor: row.get(2)?,
                year_commissioned: row.get(3)?,
                home_depot: Depot::from_label(&row.get::<_, String>(4)?),
                status: OperationalStatus::from_label(&row.get::<_, String>(5)?),
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    async fn fitness_certificates(
        &self,
        ids: &[i64],
    ) -> RepositoryResult<HashMap<i64, CertificateBook>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.lock()?;
        let sql = format!(
            "SELECT trainset_id, domain, valid_from, valid_to, status
             FROM fitness_certificate WHERE trainset_id IN ({})",
            Self::in_clause(ids)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut out: HashMap<i64, CertificateBook> = HashMap::new();
        for row in rows {
            let (id, domain_raw, from_raw, to_raw, status_raw) = row?;
            // 未知域的证书行直接跳过, 不污染三域结构
            let Some(domain) = CertificateDomain::from_label(&domain_raw) else {
                continue;
            };
            let book = out.entry(id).or_default();
            *book.get_mut(domain) = FitnessCertificate {
                domain,
                valid_from: parse_date(from_raw),
                valid_to: parse_date(to_raw),
                status: CertificateStatus::from_label(&status_raw),
            };
        }
        Ok(out)
    }

    async fn job_cards(&self, ids: &[i64]) -> RepositoryResult<HashMap<i64, Vec<JobCard>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.lock()?;
        let sql = format!(
            "SELECT trainset_id, jobcard_id, category, priority, status, created_on, expected_completion
             FROM job_card WHERE trainset_id IN ({}) ORDER BY jobcard_id",
            Self::in_clause(ids)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                JobCard {
                    jobcard_id: row.get(1)?,
                    category: row.get(2)?,
                    priority: JobPriority::from_label(&row.get::<_, String>(3)?),
                    status: JobStatus::from_label(&row.get::<_, String>(4)?),
                    created_on: parse_date(row.get(5)?),
                    expected_completion: parse_date(row.get(6)?),
                },
            ))
        })?;

        let mut out: HashMap<i64, Vec<JobCard>> = HashMap::new();
        for row in rows {
            let (id, card) = row?;
            out.entry(id).or_default().push(card);
        }
        Ok(out)
    }

    async fn branding_commitments(
        &self,
        ids: &[i64],
    ) -> RepositoryResult<HashMap<i64, BrandingCommitment>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.lock()?;
        let sql = format!(
            "SELECT trainset_id, advertiser, priority, target_exposure_hours,
                    achieved_exposure_hours, campaign_start, campaign_end, has_penalty
             FROM branding_commitment WHERE trainset_id IN ({})",
            Self::in_clause(ids)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                BrandingCommitment {
                    advertiser: row.get(1)?,
                    priority: BrandingPriority::from_label(&row.get::<_, String>(2)?),
                    target_exposure_hours: row.get(3)?,
                    achieved_exposure_hours: row.get(4)?,
                    campaign_start: parse_date(row.get(5)?),
                    campaign_end: parse_date(row.get(6)?),
                    has_penalty: row.get::<_, i64>(7)? != 0,
                },
            ))
        })?;

        let mut out = HashMap::new();
        for row in rows {
            let (id, commitment) = row?;
            out.insert(id, commitment);
        }
        Ok(out)
    }

    async fn mileage_records(
        &self,
        ids: &[i64],
    ) -> RepositoryResult<HashMap<i64, MileageRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.lock()?;
        let sql = format!(
            "SELECT trainset_id, total_km, km_since_poh, km_since_ioh, km_since_trip_maintenance,
                    bogie_condition, brake_wear, hvac_hours, updated_at
             FROM mileage_record WHERE trainset_id IN ({})",
            Self::in_clause(ids)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                MileageRecord {
                    total_km: row.get(1)?,
                    km_since_poh: row.get(2)?,
                    km_since_ioh: row.get(3)?,
                    km_since_trip_maintenance: row.get(4)?,
                    bogie_condition: row.get(5)?,
                    brake_wear: row.get(6)?,
                    hvac_hours: row.get(7)?,
                    updated_at: parse_date(row.get(8)?),
                },
            ))
        })?;

        let mut out = HashMap::new();
        for row in rows {
            let (id, record) = row?;
            out.insert(id, record);
        }
        Ok(out)
    }

    async fn cleaning_slots(
        &self,
        ids: &[i64],
    ) -> RepositoryResult<HashMap<i64, Vec<CleaningSlot>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.lock()?;
        let sql = format!(
            "SELECT trainset_id, cleaning_id, kind, status, slot_time, bay_number, staff
             FROM cleaning_slot WHERE trainset_id IN ({}) ORDER BY cleaning_id",
            Self::in_clause(ids)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                CleaningSlot {
                    cleaning_id: row.get(1)?,
                    kind: CleaningKind::from_label(&row.get::<_, String>(2)?),
                    status: CleaningStatus::from_label(&row.get::<_, String>(3)?),
                    slot_time: parse_date(row.get(4)?),
                    bay_number: row.get(5)?,
                    staff: row.get(6)?,
                },
            ))
        })?;

        let mut out: HashMap<i64, Vec<CleaningSlot>> = HashMap::new();
        for row in rows {
            let (id, slot) = row?;
            out.entry(id).or_default().push(slot);
        }
        Ok(out)
    }

    async fn bays(&self) -> RepositoryResult<Vec<StablingBay>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT bay_id, depot, line, position_order, occupied, blocked,
                    currently_assigned_trainset
             FROM stabling_bay ORDER BY bay_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StablingBay {
                bay_id: row.get(0)?,
                depot: Depot::from_label(&row.get::<_, String>(1)?),
                line: row.get(2)?,
                position_order: row.get(3)?,
                occupied: row.get::<_, i64>(4)? != 0,
                blocked: row.get::<_, i64>(5)? != 0,
                currently_assigned_trainset: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
