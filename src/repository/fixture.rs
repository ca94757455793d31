// ==========================================
// 地铁夜间编组排班系统 - 内存数据源与演示车队
// ==========================================
// 用途: 演示二进制与测试套件共用的确定性夹具
// 生成规律: 按车号取模, 与上游综合车队数据口径一致
// ==========================================

use crate::domain::types::{
    BrandingPriority, CertificateDomain, CertificateStatus, CleaningKind, CleaningStatus, Depot,
    JobPriority, JobStatus, OperationalStatus,
};
use crate::domain::{
    BrandingCommitment, CertificateBook, CleaningSlot, FitnessCertificate, JobCard, MileageRecord,
    StablingBay, Trainset,
};
use crate::repository::error::RepositoryResult;
use crate::repository::fleet_source::FleetDataSource;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashMap;

// ==========================================
// InMemoryFleet - 内存车队数据源
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct InMemoryFleet {
    pub trainsets: Vec<Trainset>,
    pub certificates: HashMap<i64, CertificateBook>,
    pub job_cards: HashMap<i64, Vec<JobCard>>,
    pub branding: HashMap<i64, BrandingCommitment>,
    pub mileage: HashMap<i64, MileageRecord>,
    pub cleaning: HashMap<i64, Vec<CleaningSlot>>,
    pub bays: Vec<StablingBay>,
}

impl InMemoryFleet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push_trainset(&mut self, trainset: Trainset) {
        self.trainsets.push(trainset);
    }

    pub fn set_certificates(&mut self, trainset_id: i64, book: CertificateBook) {
        self.certificates.insert(trainset_id, book);
    }

    pub fn push_job_card(&mut self, trainset_id: i64, card: JobCard) {
        self.job_cards.entry(trainset_id).or_default().push(card);
    }

    pub fn set_branding(&mut self, trainset_id: i64, commitment: BrandingCommitment) {
        self.branding.insert(trainset_id, commitment);
    }

    pub fn set_mileage(&mut self, trainset_id: i64, record: MileageRecord) {
        self.mileage.insert(trainset_id, record);
    }

    pub fn push_cleaning_slot(&mut self, trainset_id: i64, slot: CleaningSlot) {
        self.cleaning.entry(trainset_id).or_default().push(slot);
    }

    pub fn push_bay(&mut self, bay: StablingBay) {
        self.bays.push(bay);
    }

    fn collect_by_ids<T: Clone>(map: &HashMap<i64, T>, ids: &[i64]) -> HashMap<i64, T> {
        ids.iter()
            .filter_map(|id| map.get(id).map(|v| (*id, v.clone())))
            .collect()
    }
}

#[async_trait]
impl FleetDataSource for InMemoryFleet {
    async fn trainsets(&self) -> RepositoryResult<Vec<Trainset>> {
        Ok(self.trainsets.clone())
    }

    async fn fitness_certificates(
        &self,
        ids: &[i64],
    ) -> RepositoryResult<HashMap<i64, CertificateBook>> {
        Ok(Self::collect_by_ids(&self.certificates, ids))
    }

    async fn job_cards(&self, ids: &[i64]) -> RepositoryResult<HashMap<i64, Vec<JobCard>>> {
        Ok(Self::collect_by_ids(&self.job_cards, ids))
    }

    async fn branding_commitments(
        &self,
        ids: &[i64],
    ) -> RepositoryResult<HashMap<i64, BrandingCommitment>> {
        Ok(Self::collect_by_ids(&self.branding, ids))
    }

    async fn mileage_records(
        &self,
        ids: &[i64],
    ) -> RepositoryResult<HashMap<i64, MileageRecord>> {
        Ok(Self::collect_by_ids(&self.mileage, ids))
    }

    async fn cleaning_slots(
        &self,
        ids: &[i64],
    ) -> RepositoryResult<HashMap<i64, Vec<CleaningSlot>>> {
        Ok(Self::collect_by_ids(&self.cleaning, ids))
    }

    async fn bays(&self) -> RepositoryResult<Vec<StablingBay>> {
        Ok(self.bays.clone())
    }
}

// ==========================================
// 演示车队生成
// ==========================================

const VENDORS: [&str; 3] = ["Hyundai Rotem", "Alstom", "BEML"];
const ADVERTISERS: [&str; 5] = ["Amul", "Airtel", "Coca Cola", "LIC", "Tata Motors"];
const FAULT_CATEGORIES: [&str; 6] = [
    "doors",
    "signalling",
    "telecom",
    "bogie",
    "brake system",
    "HVAC",
];

/// 生成确定性演示车队
///
/// 车号取模驱动全部字段, 同参数两次生成结果一致:
/// - 状态切分: 前 28% 在役, 到 64% 备用, 其余检修
/// - 厂商三分, 车辆段两分, 证书有效期按域错开
pub fn demo_fleet(n: usize, today: NaiveDate) -> InMemoryFleet {
    let mut fleet = InMemoryFleet::empty();
    let in_service_cut = n * 28 / 100;
    let standby_cut = n * 64 / 100;

    for i in 1..=n as i64 {
        let idx = i as usize;
        let status = if idx <= in_service_cut {
            OperationalStatus::InService
        } else if idx <= standby_cut {
            OperationalStatus::Standby
        } else {
            OperationalStatus::Maintenance
        };

        fleet.push_trainset(Trainset {
            trainset_id: i,
            rake_number: format!("R{}", 1000 + i - 1),
            vendor: VENDORS[idx % 3].to_string(),
            year_commissioned: today.year() - 10 + (i % 10) as i32,
            home_depot: if i % 2 == 0 { Depot::DepotA } else { Depot::DepotB },
            status,
        });

        fleet.set_certificates(i, demo_certificates(i, today));

        let num_jobs = 1 + (i % 3);
        for j in 0..num_jobs {
            let priorities = [
                JobPriority::Emergency,
                JobPriority::High,
                JobPriority::Medium,
                JobPriority::Low,
            ];
            let statuses = [JobStatus::Open, JobStatus::InProgress, JobStatus::Closed];
            fleet.push_job_card(
                i,
                JobCard {
                    jobcard_id: format!("JC{:03}{}", i, j + 1),
                    category: FAULT_CATEGORIES[(j as usize) % FAULT_CATEGORIES.len()].to_string(),
                    priority: priorities[((i + j) % 4) as usize],
                    status: statuses[((i + 2 * j) % 3) as usize],
                    created_on: Some(today - Duration::days(j * 5)),
                    expected_completion: Some(today + Duration::days(3 + j * 2)),
                },
            );
        }

        fleet.set_branding(
            i,
            BrandingCommitment {
                advertiser: ADVERTISERS[idx % ADVERTISERS.len()].to_string(),
                priority: if i % 2 == 0 {
                    BrandingPriority::Critical
                } else {
                    BrandingPriority::Normal
                },
                target_exposure_hours: (500 + (i * 10) % 500) as f64,
                achieved_exposure_hours: (300 + (i * 8) % 400) as f64,
                campaign_start: Some(today - Duration::days(30)),
                campaign_end: Some(today + Duration::days(60 + i % 30)),
                has_penalty: i % 3 == 0,
            },
        );

        let base_km = 50_000 + i * 1_000;
        fleet.set_mileage(
            i,
            MileageRecord {
                total_km: base_km,
                km_since_poh: base_km % 20_000,
                km_since_ioh: base_km % 5_000,
                km_since_trip_maintenance: base_km % 500,
                bogie_condition: (50 + i % 50) as i32,
                brake_wear: (10 + i % 80) as i32,
                hvac_hours: 2_000 + (i * 50) % 8_000,
                updated_at: Some(today),
            },
        );

        let num_slots = 1 + (i % 3);
        for s in 0..num_slots {
            let kinds = [
                CleaningKind::Fumigation,
                CleaningKind::Deep,
                CleaningKind::Detailing,
                CleaningKind::Trip,
            ];
            let status = match (i + s) % 3 {
                0 => CleaningStatus::Scheduled,
                1 => CleaningStatus::InProgress,
                _ => CleaningStatus::Completed,
            };
            let slot_time = if status == CleaningStatus::Completed {
                today - Duration::days(i % 10 + s * 3)
            } else {
                today + Duration::days(s * 3)
            };
            fleet.push_cleaning_slot(
                i,
                CleaningSlot {
                    cleaning_id: format!("CL{:03}{}", i, s + 1),
                    kind: kinds[(s as usize) % kinds.len()],
                    status,
                    slot_time: Some(slot_time),
                    bay_number: Some((1 + i % 20) as i32),
                    staff: Some(format!("Staff{}", (s % 3) + 1)),
                },
            );
        }

        fleet.push_bay(StablingBay {
            bay_id: i,
            depot: if i % 2 == 0 { Depot::DepotA } else { Depot::DepotB },
            line: if i % 3 == 0 { "Blue Line" } else { "Green Line" }.to_string(),
            position_order: (1 + (i % 24)) as i32,
            occupied: i % 4 == 0,
            blocked: i % 25 == 0,
            currently_assigned_trainset: Some(i),
        });
    }

    fleet
}

fn demo_certificates(i: i64, today: NaiveDate) -> CertificateBook {
    let cert = |domain, from_days: i64, to_days: i64, expired: bool| FitnessCertificate {
        domain,
        valid_from: Some(today - Duration::days(from_days)),
        valid_to: Some(today + Duration::days(to_days)),
        status: if expired {
            CertificateStatus::Expired
        } else {
            CertificateStatus::Valid
        },
    };

    CertificateBook {
        rolling_stock: cert(
            CertificateDomain::RollingStock,
            30,
            150 + i % 60,
            i % 4 == 0,
        ),
        signalling: cert(CertificateDomain::Signalling, 20, 120 + i % 45, i % 5 == 0),
        telecom: cert(CertificateDomain::Telecom, 15, 90 + i % 30, i % 6 == 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_fleet_is_deterministic() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        let a = demo_fleet(40, today);
        let b = demo_fleet(40, today);
        assert_eq!(a.trainsets.len(), 40);
        assert_eq!(a.bays.len(), 40);
        for (x, y) in a.trainsets.iter().zip(b.trainsets.iter()) {
            assert_eq!(x.trainset_id, y.trainset_id);
            assert_eq!(x.vendor, y.vendor);
            assert_eq!(x.status, y.status);
        }
    }

    #[test]
    fn test_demo_fleet_status_split() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        let fleet = demo_fleet(100, today);
        let in_service = fleet
            .trainsets
            .iter()
            .filter(|t| t.status == OperationalStatus::InService)
            .count();
        let maintenance = fleet
            .trainsets
            .iter()
            .filter(|t| t.status == OperationalStatus::Maintenance)
            .count();
        assert_eq!(in_service, 28);
        assert_eq!(maintenance, 36);
    }

    #[tokio::test]
    async fn test_in_memory_source_filters_by_ids() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        let fleet = demo_fleet(10, today);
        let certs = fleet.fitness_certificates(&[1, 2, 999]).await.unwrap();
        assert_eq!(certs.len(), 2);
        assert!(certs.contains_key(&1));
        assert!(!certs.contains_key(&999));
    }
}
