use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::{AvailabilityError, Session, UpsertAvailabilityRequest};
use doctor_cell::services::{
    AvailabilityService, AvailabilityStore, InMemoryAvailabilityStore, SupabaseAvailabilityStore,
};
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn request(date: &str, session: &str, start: Option<&str>, end: Option<&str>) -> UpsertAvailabilityRequest {
    UpsertAvailabilityRequest {
        date: date.to_string(),
        session: session.to_string(),
        is_available: start.is_some(),
        start_time: start.map(str::to_string),
        end_time: end.map(str::to_string),
    }
}

fn memory_service() -> AvailabilityService {
    AvailabilityService::new(Arc::new(InMemoryAvailabilityStore::new()), 7)
}

fn supabase_store(server: &MockServer) -> SupabaseAvailabilityStore {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    SupabaseAvailabilityStore::new(Arc::new(SupabaseClient::new(&config)))
}

// ==============================================================================
// SERVICE RULES
// ==============================================================================

#[tokio::test]
async fn upsert_then_weekly_schedule_lists_generated_slots() {
    let service = memory_service();

    service
        .upsert(3, request("2026-10-17", "morning", Some("09:00"), Some("10:30")))
        .await
        .unwrap();

    let schedule = service.weekly_schedule(3, date(16)).await.unwrap();
    assert_eq!(schedule.len(), 8);
    assert_eq!(schedule[0].date, date(16));
    assert_eq!(schedule[7].date, date(23));

    let day = &schedule[1];
    assert!(day.morning.is_available);
    assert_eq!(day.morning.timeslots, vec!["09:00", "09:30", "10:00"]);
    assert!(!day.evening.is_available);
    assert!(day.evening.timeslots.is_empty());
    assert_eq!(day.evening.id, None);
}

#[tokio::test]
async fn second_upsert_replaces_the_window() {
    let service = memory_service();

    let first = service
        .upsert(3, request("2026-10-17", "evening", Some("14:00"), Some("16:00")))
        .await
        .unwrap();
    let second = service
        .upsert(3, request("2026-10-17", "evening", Some("15:00"), Some("16:00")))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    let windows = service.list_windows(3, date(17), date(17)).await.unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].start_time, Some(t(15, 0)));
}

#[tokio::test]
async fn disabling_a_window_clears_its_times() {
    let service = memory_service();

    let mut disable = request("2026-10-17", "morning", Some("09:00"), Some("10:00"));
    disable.is_available = false;

    let window = service.upsert(3, disable).await.unwrap();
    assert!(!window.is_available);
    assert_eq!(window.start_time, None);
    assert_eq!(window.end_time, None);
}

#[tokio::test]
async fn invalid_writes_store_nothing() {
    let service = memory_service();

    let cases = [
        request("2026-10-17", "morning", Some("07:30"), Some("09:00")),
        request("2026-10-17", "morning", Some("09:15"), Some("10:00")),
        request("2026-10-17", "evening", Some("16:00"), Some("15:00")),
        request("2026-10-17", "afternoon", Some("14:00"), Some("15:00")),
        request("17/10/2026", "morning", Some("09:00"), Some("10:00")),
        request("2026-10-17", "morning", Some("09:00"), None),
    ];

    for case in cases {
        assert_matches!(service.upsert(3, case).await, Err(AvailabilityError::Validation(_)));
    }

    assert!(service.list_windows(3, date(1), date(31)).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_unknown_window_is_not_found() {
    let service = memory_service();
    let window = service
        .upsert(3, request("2026-10-17", "morning", Some("09:00"), Some("10:00")))
        .await
        .unwrap();

    assert_matches!(service.delete(4, window.id).await, Err(AvailabilityError::NotFound));
    assert!(service.delete(3, window.id).await.is_ok());
    assert_matches!(service.delete(3, window.id).await, Err(AvailabilityError::NotFound));
}

// ==============================================================================
// POSTGREST STORE
// ==============================================================================

#[tokio::test]
async fn supabase_upsert_merges_on_doctor_date_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_daily_availability"))
        .and(query_param("on_conflict", "doctor_id,date,session"))
        .and(header_exists("Prefer"))
        .and(body_partial_json(json!({
            "doctor_id": 3,
            "session": "morning",
            "start_time": "09:00",
            "end_time": "10:00"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::availability_response(11, 3, "2026-10-17", "morning", Some("09:00:00"), Some("10:00:00"))
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let service = AvailabilityService::new(Arc::new(supabase_store(&server)), 7);
    let window = service
        .upsert(3, request("2026-10-17", "morning", Some("09:00"), Some("10:00")))
        .await
        .unwrap();

    assert_eq!(window.id, 11);
    assert_eq!(window.session, Session::Morning);
    assert_eq!(window.start_time, Some(t(9, 0)));
}

#[tokio::test]
async fn supabase_list_range_orders_by_date_then_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_daily_availability"))
        .and(query_param("doctor_id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_response(2, 3, "2026-10-17", "evening", Some("14:00"), Some("15:00")),
            MockSupabaseResponses::availability_response(1, 3, "2026-10-17", "morning", Some("09:00"), Some("10:00")),
            MockSupabaseResponses::availability_response(3, 3, "2026-10-16", "evening", None, None)
        ])))
        .mount(&server)
        .await;

    let windows = supabase_store(&server)
        .list_range(3, date(16), date(23))
        .await
        .unwrap();

    let ids: Vec<i64> = windows.iter().map(|w| w.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
    assert!(!windows[0].is_available);
}

#[tokio::test]
async fn supabase_delete_of_missing_row_reports_false() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctor_daily_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(!supabase_store(&server).delete(3, 99).await.unwrap());
}
