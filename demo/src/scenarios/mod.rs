//! Demo scenarios wired from real CUSTOS components.

pub mod access_control;
pub mod audit_trail;
pub mod compliance;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use custos_analysis::{DetectorConfig, ThresholdDetector};
use custos_audit::InMemoryAuditStore;
use custos_contracts::{
    audit::PhiAccessEvent,
    error::CustosResult,
    rbac::{Action, Resource, Role},
};
use custos_core::{recorder::PhiAccessRecorder, traits::Clock};

/// The policy file every scenario evaluates against.
pub const POLICY: &str = include_str!("../../policies/healthcare.toml");

/// Start of the simulated clinic day (UTC).
pub fn day_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap()
}

/// A scripted clock for replaying a day of traffic deterministically.
///
/// Each `now()` returns the current simulated time and nudges it forward a
/// couple of seconds; `advance_to` jumps between scripted events.
pub struct SimClock {
    current: Mutex<DateTime<Utc>>,
}

impl SimClock {
    pub fn starting_at(t: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(t),
        }
    }

    pub fn advance_to(&self, t: DateTime<Utc>) {
        *self.current.lock().expect("sim clock lock poisoned") = t;
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.current.lock().expect("sim clock lock poisoned");
        let t = *current;
        *current = t + Duration::seconds(2);
        t
    }
}

/// Build the live audit pipeline: in-memory chained store, scripted clock,
/// and the threshold detector with its default thresholds.
pub fn pipeline() -> (Arc<InMemoryAuditStore>, Arc<SimClock>, PhiAccessRecorder) {
    let store = Arc::new(InMemoryAuditStore::new());
    let clock = Arc::new(SimClock::starting_at(day_start()));
    let recorder = PhiAccessRecorder::new(
        store.clone(),
        clock.clone(),
        Arc::new(ThresholdDetector::new(DetectorConfig::default())),
    );
    (store, clock, recorder)
}

/// One simulated PHI operation.
pub fn access(
    user_id: &str,
    role: Role,
    action: Action,
    resource: Resource,
    resource_id: &str,
) -> PhiAccessEvent {
    PhiAccessEvent {
        user_id: user_id.to_string(),
        user_role: role,
        action,
        resource_type: resource,
        resource_id: Some(resource_id.to_string()),
        ip_address: "10.20.0.14".to_string(),
        user_agent: "custos-demo/0.1".to_string(),
        correlation_id: None,
        contains_phi: true,
        success: true,
        metadata: serde_json::Map::new(),
    }
}

/// Replay one simulated clinic day through the recorder: routine morning
/// accesses, a rapid burst, a late-night access, and an oversized export.
pub fn seed_traffic(recorder: &PhiAccessRecorder, clock: &SimClock) -> CustosResult<()> {
    let day = day_start();

    // Routine care: a nurse checks a handful of students and their meds.
    for (i, student) in ["student-018", "student-044", "student-101"]
        .iter()
        .enumerate()
    {
        clock.advance_to(day + Duration::minutes(9 * 60 + i as i64 * 3));
        recorder.log_phi_access(access(
            "nurse-7",
            Role::Nurse,
            Action::Read,
            Resource::HealthRecord,
            student,
        ))?;
        recorder.log_phi_access(access(
            "nurse-7",
            Role::Nurse,
            Action::Read,
            Resource::Medication,
            student,
        ))?;
    }

    // A compromised account rips through one record in a tight burst.
    clock.advance_to(day + Duration::minutes(10 * 60 + 15));
    for _ in 0..14 {
        recorder.log_phi_access(access(
            "staff-23",
            Role::Staff,
            Action::Read,
            Resource::HealthRecord,
            "student-077",
        ))?;
    }

    // The same account comes back long after close.
    clock.advance_to(day + Duration::minutes(23 * 60 + 40));
    recorder.log_phi_access(access(
        "staff-23",
        Role::Staff,
        Action::Read,
        Resource::HealthRecord,
        "student-077",
    ))?;

    // An administrator exports far more records than any routine job.
    clock.advance_to(day + Duration::minutes(23 * 60 + 45));
    let mut export = access(
        "admin-2",
        Role::Admin,
        Action::Export,
        Resource::Report,
        "report-2025-q1",
    );
    export
        .metadata
        .insert("recordCount".to_string(), serde_json::json!(4_812));
    recorder.log_phi_access(export)?;

    Ok(())
}
