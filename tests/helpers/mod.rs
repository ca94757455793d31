// ==========================================
// 测试辅助: 可定制的车队构造
// ==========================================
#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use metro_induction_aps::{
    BrandingCommitment, BrandingPriority, CertificateBook, CertificateDomain, CertificateStatus,
    CleaningKind, CleaningSlot, CleaningStatus, Depot, FitnessCertificate, InMemoryFleet, JobCard,
    JobPriority, JobStatus, MileageRecord, OperationalStatus, StablingBay, Trainset,
};

/// 固定快照日, 保证测试确定性
pub fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
}

pub fn snapshot_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 15, 1, 30, 0).unwrap()
}

// ==========================================
// TrainSpec - 单车测试规格
// ==========================================
#[derive(Debug, Clone)]
pub struct TrainSpec {
    pub id: i64,
    pub depot: Depot,
    pub vendor: &'static str,
    pub year: i32,
    pub status: OperationalStatus,
    pub valid_certs: usize,      // 0..=3
    pub cert_headroom_days: i64, // 有效证书的到期余量
    pub open_emergency: bool,
    pub total_km: i64,
    pub bogie_condition: i32,
    /// Some(achieved_ratio): 活跃 critical 冠名, 完成率为给定值
    pub critical_branding: Option<f64>,
    /// Some(days): 最近一次已完成清洁距今天数
    pub cleaned_days_ago: Option<i64>,
}

impl Default for TrainSpec {
    fn default() -> Self {
        Self {
            id: 1,
            depot: Depot::DepotA,
            vendor: "Hyundai Rotem",
            year: 2022,
            status: OperationalStatus::InService,
            valid_certs: 3,
            cert_headroom_days: 90,
            open_emergency: false,
            total_km: 80_000,
            bogie_condition: 85,
            critical_branding: None,
            cleaned_days_ago: Some(3),
        }
    }
}

pub fn add_train(fleet: &mut InMemoryFleet, spec: TrainSpec) {
    let today = base_date();

    fleet.push_trainset(Trainset {
        trainset_id: spec.id,
        rake_number: format!("R{}", 1000 + spec.id),
        vendor: spec.vendor.to_string(),
        year_commissioned: spec.year,
        home_depot: spec.depot,
        status: spec.status,
    });

    let mut book = CertificateBook::default();
    for (k, domain) in CertificateDomain::ALL.into_iter().enumerate() {
        *book.get_mut(domain) = FitnessCertificate {
            domain,
            valid_from: Some(today - Duration::days(30)),
            valid_to: Some(today + Duration::days(spec.cert_headroom_days)),
            status: if k < spec.valid_certs {
                CertificateStatus::Valid
            } else {
                CertificateStatus::Expired
            },
        };
    }
    fleet.set_certificates(spec.id, book);

    if spec.open_emergency {
        fleet.push_job_card(
            spec.id,
            JobCard {
                jobcard_id: format!("JC{:03}E", spec.id),
                category: "brake system".to_string(),
                priority: JobPriority::Emergency,
                status: JobStatus::Open,
                created_on: Some(today - Duration::days(1)),
                expected_completion: Some(today + Duration::days(2)),
            },
        );
    }

    if let Some(ratio) = spec.critical_branding {
        fleet.set_branding(
            spec.id,
            BrandingCommitment {
                advertiser: "Amul".to_string(),
                priority: BrandingPriority::Critical,
                target_exposure_hours: 500.0,
                achieved_exposure_hours: 500.0 * ratio,
                campaign_start: Some(today - Duration::days(15)),
                campaign_end: Some(today + Duration::days(45)),
                has_penalty: true,
            },
        );
    }

    fleet.set_mileage(
        spec.id,
        MileageRecord {
            total_km: spec.total_km,
            km_since_poh: spec.total_km % 20_000,
            km_since_ioh: spec.total_km % 5_000,
            km_since_trip_maintenance: spec.total_km % 500,
            bogie_condition: spec.bogie_condition,
            brake_wear: 20,
            hvac_hours: 4_000,
            updated_at: Some(today),
        },
    );

    if let Some(days) = spec.cleaned_days_ago {
        fleet.push_cleaning_slot(
            spec.id,
            CleaningSlot {
                cleaning_id: format!("CL{:03}1", spec.id),
                kind: CleaningKind::Deep,
                status: CleaningStatus::Completed,
                slot_time: Some(today - Duration::days(days)),
                bay_number: Some(1),
                staff: Some("Staff1".to_string()),
            },
        );
    }
}

/// 可用股道; assigned 车号的列车视其为归属股道
pub fn add_bay(fleet: &mut InMemoryFleet, bay_id: i64, depot: Depot, position: i32, assigned: Option<i64>) {
    fleet.push_bay(StablingBay {
        bay_id,
        depot,
        line: "Blue Line".to_string(),
        position_order: position,
        occupied: false,
        blocked: false,
        currently_assigned_trainset: assigned,
    });
}

/// n 辆健康同质列车 + 每车一条可用归属股道 (段别与车辆交替)
pub fn uniform_fleet(n: i64, roster_hint: i32) -> InMemoryFleet {
    let mut fleet = InMemoryFleet::empty();
    let vendors = ["Hyundai Rotem", "Alstom", "BEML"];
    for id in 1..=n {
        let depot = if id % 2 == 0 { Depot::DepotA } else { Depot::DepotB };
        add_train(
            &mut fleet,
            TrainSpec {
                id,
                depot,
                vendor: vendors[(id % 3) as usize],
                year: if id % 2 == 0 { 2022 } else { 2012 },
                total_km: 60_000 + id * 500,
                ..TrainSpec::default()
            },
        );
        add_bay(
            &mut fleet,
            id,
            depot,
            (1 + (id - 1) % roster_hint.max(1) as i64) as i32,
            Some(id),
        );
    }
    fleet
}
