//! Driver attendance: single-record creation and the per-day fan-out that
//! follows a newly persisted trip.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::models::{Attendance, AttendanceStatus, Trip},
    infrastructure::{
        auth::AuthenticatedUser,
        state::AppState,
        store::{FleetStore, StoreError},
    },
};

use super::errors::ServiceError;

/// Attendance writes issued concurrently per batch.
pub const ATTENDANCE_BATCH: usize = 8;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendanceRequest {
    pub driver_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
    pub trip_id: Option<Uuid>,
    #[validate(length(max = 64))]
    pub trip_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailedAttendance {
    pub date: NaiveDate,
    pub error: String,
}

/// Outcome of a best-effort attendance batch. Dates already on record are
/// counted separately from real failures.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub recorded: Vec<NaiveDate>,
    pub already_recorded: Vec<NaiveDate>,
    pub failed: Vec<FailedAttendance>,
}

impl AttendanceReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Every calendar day from the earliest to the latest route date, inclusive.
/// Falls back to the trip's own dates when no route carries any.
pub fn trip_date_range(trip: &Trip) -> Vec<NaiveDate> {
    let Some((first, last)) = trip.date_bounds() else {
        return Vec::new();
    };
    first.iter_days().take_while(|day| *day <= last).collect()
}

/// Creates one `Present` attendance per day the trip spans, in batches of
/// [`ATTENDANCE_BATCH`] concurrent calls. None of them can fail the trip.
pub async fn record_trip_attendance(
    store: &dyn FleetStore,
    trip: &Trip,
    remark: &str,
    created_by: Uuid,
) -> AttendanceReport {
    let dates = trip_date_range(trip);
    let now = Utc::now();
    let mut results = Vec::with_capacity(dates.len());
    for batch in dates.chunks(ATTENDANCE_BATCH) {
        let calls = batch.iter().map(|date| {
            store.create_attendance(Attendance {
                id: Uuid::new_v4(),
                driver_id: trip.driver_id,
                date: *date,
                status: AttendanceStatus::Present,
                remarks: Some(remark.to_owned()),
                trip_id: Some(trip.id),
                trip_number: Some(trip.trip_number.clone()),
                created_by,
                created_at: now,
            })
        });
        results.extend(join_all(calls).await);
    }

    let report = collect_report(dates.into_iter().zip(results));
    if !report.is_complete() {
        warn!(
            trip_id = %trip.id,
            failed = report.failed.len(),
            "some trip attendance records could not be created"
        );
    }
    info!(
        trip_id = %trip.id,
        recorded = report.recorded.len(),
        already_recorded = report.already_recorded.len(),
        "trip attendance fan-out finished"
    );
    report
}

fn collect_report<T>(
    results: impl IntoIterator<Item = (NaiveDate, Result<T, StoreError>)>,
) -> AttendanceReport {
    let mut report = AttendanceReport::default();
    for (date, result) in results {
        match result {
            Ok(_) => report.recorded.push(date),
            Err(StoreError::Duplicate) => report.already_recorded.push(date),
            Err(err) => {
                warn!(%date, error = %err, "attendance record failed");
                report.failed.push(FailedAttendance {
                    date,
                    error: err.to_string(),
                });
            }
        }
    }
    report
}

pub struct AttendanceService {
    state: Arc<AppState>,
}

impl AttendanceService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        payload: CreateAttendanceRequest,
    ) -> Result<Attendance, ServiceError> {
        payload.validate()?;
        let record = self
            .state
            .store
            .create_attendance(Attendance {
                id: Uuid::new_v4(),
                driver_id: payload.driver_id,
                date: payload.date,
                status: payload.status,
                remarks: payload.remarks,
                trip_id: payload.trip_id,
                trip_number: payload.trip_number,
                created_by: actor.user_id,
                created_at: Utc::now(),
            })
            .await?;
        info!(
            driver_id = %record.driver_id,
            date = %record.date,
            status = record.status.as_str(),
            "attendance recorded"
        );
        Ok(record)
    }

    pub async fn list(&self, driver_id: Uuid) -> Result<Vec<Attendance>, ServiceError> {
        Ok(self.state.store.list_attendance(driver_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::models::{RouteBreakdown, TripStatus},
        infrastructure::store::MemoryStore,
    };
    use rust_decimal::Decimal;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn trip_with_route_dates(route_dates: Vec<Vec<NaiveDate>>, dates: Vec<NaiveDate>) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            trip_number: "TRP-0000ABCD".to_string(),
            dates,
            start_km: 0,
            end_km: 0,
            total_km: 0,
            driver_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            status: TripStatus::InProgress,
            remarks: None,
            routes: route_dates
                .into_iter()
                .map(|dates| RouteBreakdown {
                    dates,
                    ..RouteBreakdown::default()
                })
                .collect(),
            trip_route_cost: Decimal::ZERO,
            trip_expenses: Decimal::ZERO,
            trip_diesel_cost: Decimal::ZERO,
            trip_fuel_quantity: Decimal::ZERO,
            remaining_amount: Decimal::ZERO,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn range_spans_earliest_to_latest_route_date() {
        let trip = trip_with_route_dates(vec![vec![day(6), day(5)], vec![day(7)]], vec![]);
        assert_eq!(trip_date_range(&trip), vec![day(5), day(6), day(7)]);
    }

    #[test]
    fn range_fills_gaps_between_routes() {
        let trip = trip_with_route_dates(vec![vec![day(1)], vec![day(4)]], vec![]);
        assert_eq!(trip_date_range(&trip), vec![day(1), day(2), day(3), day(4)]);
    }

    #[test]
    fn range_falls_back_to_trip_dates() {
        let trip = trip_with_route_dates(vec![vec![]], vec![day(9), day(8)]);
        assert_eq!(trip_date_range(&trip), vec![day(8), day(9)]);
    }

    #[test]
    fn range_is_empty_without_any_dates() {
        let trip = trip_with_route_dates(vec![vec![]], vec![]);
        assert!(trip_date_range(&trip).is_empty());
    }

    #[test]
    fn report_separates_duplicates_from_failures() {
        let report = collect_report(vec![
            (day(5), Ok(())),
            (day(6), Err(StoreError::Duplicate)),
            (day(7), Err(StoreError::Backend("timeout".to_string()))),
        ]);

        assert_eq!(report.recorded, vec![day(5)]);
        assert_eq!(report.already_recorded, vec![day(6)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].date, day(7));
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn fan_out_creates_one_record_per_day() {
        let store = MemoryStore::default();
        let trip = trip_with_route_dates(vec![vec![day(5)], vec![day(7)]], vec![]);
        let creator = Uuid::new_v4();

        let report = record_trip_attendance(&store, &trip, "On Trip", creator).await;
        assert_eq!(report.recorded, vec![day(5), day(6), day(7)]);

        let records = store.list_attendance(trip.driver_id).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|record| {
            record.status == AttendanceStatus::Present
                && record.remarks.as_deref() == Some("On Trip")
                && record.trip_id == Some(trip.id)
                && record.trip_number.as_deref() == Some("TRP-0000ABCD")
        }));
    }

    #[tokio::test]
    async fn fan_out_tolerates_existing_records() {
        let store = MemoryStore::default();
        let trip = trip_with_route_dates(vec![vec![day(5), day(6)]], vec![]);
        record_trip_attendance(&store, &trip, "On Trip", Uuid::new_v4()).await;

        let again = record_trip_attendance(&store, &trip, "On Trip", Uuid::new_v4()).await;
        assert!(again.recorded.is_empty());
        assert_eq!(again.already_recorded, vec![day(5), day(6)]);
        assert!(again.is_complete());
    }

    #[tokio::test]
    async fn fan_out_covers_long_trips_in_order() {
        let store = MemoryStore::default();
        let last = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let trip = trip_with_route_dates(vec![vec![day(1), last]], vec![]);

        let report = record_trip_attendance(&store, &trip, "On Trip", Uuid::new_v4()).await;
        assert_eq!(report.recorded.len(), 60);
        assert_eq!(report.recorded.first(), Some(&day(1)));
        assert_eq!(report.recorded.last(), Some(&last));
        assert!(report.recorded.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
