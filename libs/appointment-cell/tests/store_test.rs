use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{
    AppointmentQuery, AppointmentStatus, NewAppointment, Participant, RecordFields,
};
use appointment_cell::services::{
    AppointmentStore, MedicalRecordStore, SupabaseAppointmentStore, SupabaseMedicalRecordStore,
};
use shared_database::{DatabaseError, SupabaseClient};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn client(server: &MockServer) -> Arc<SupabaseClient> {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    Arc::new(SupabaseClient::new(&config))
}

fn new_appointment() -> NewAppointment {
    NewAppointment {
        doctor_id: 1,
        patient_id: 10,
        date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
        time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        status: AppointmentStatus::Pending,
    }
}

#[tokio::test]
async fn insert_posts_the_row_and_returns_representation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "doctor_id": 1,
            "patient_id": 10,
            "date": "2026-10-20",
            "time": "09:30",
            "status": "pending"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(42, 1, 10, "2026-10-20", "09:30:00", "pending")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseAppointmentStore::new(client(&server));
    let appointment = store.insert(new_appointment()).await.unwrap();

    assert_eq!(appointment.id, 42);
    assert_eq!(appointment.time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    assert_eq!(appointment.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn unique_violation_on_insert_is_a_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response(
                "duplicate key value violates unique constraint \"appointments_active_slot_key\"",
                "23505",
            ),
        ))
        .mount(&server)
        .await;

    let store = SupabaseAppointmentStore::new(client(&server));

    assert_matches!(store.insert(new_appointment()).await, Err(DatabaseError::Conflict(_)));
}

#[tokio::test]
async fn find_active_at_filters_out_cancelled_rows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", "eq.1"))
        .and(query_param("date", "eq.2026-10-20"))
        .and(query_param("time", "eq.09:30"))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseAppointmentStore::new(client(&server));
    let held = store
        .find_active_at(
            1,
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        )
        .await
        .unwrap();

    assert!(held.is_none());
}

#[tokio::test]
async fn transition_is_conditional_on_the_expected_status() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.42"))
        .and(query_param("status", "eq.pending"))
        .and(body_partial_json(json!({ "status": "cancelled" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(42, 1, 10, "2026-10-20", "09:30:00", "cancelled")
        ])))
        .mount(&server)
        .await;

    let store = SupabaseAppointmentStore::new(client(&server));
    let updated = store
        .transition_status(42, AppointmentStatus::Pending, AppointmentStatus::Cancelled, None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn transition_matching_no_row_returns_none() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = SupabaseAppointmentStore::new(client(&server));
    let updated = store
        .transition_status(42, AppointmentStatus::Confirmed, AppointmentStatus::Completed, None)
        .await
        .unwrap();

    assert!(updated.is_none());
}

#[tokio::test]
async fn history_query_orders_newest_first() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", "eq.10"))
        .and(query_param("order", "date.desc,time.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(2, 1, 10, "2026-10-21", "10:00:00", "confirmed"),
            MockSupabaseResponses::appointment_response(1, 1, 10, "2026-10-20", "09:00:00", "completed")
        ])))
        .mount(&server)
        .await;

    let store = SupabaseAppointmentStore::new(client(&server));
    let rows = store
        .query(&AppointmentQuery::for_participant(Participant::Patient(10)).newest_first())
        .await
        .unwrap();

    assert_eq!(rows.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 1]);
}

#[tokio::test]
async fn record_upsert_reports_creation_and_merges_on_appointment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("appointment_id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("on_conflict", "appointment_id"))
        .and(header("Prefer", "resolution=merge-duplicates,return=representation"))
        .and(body_partial_json(json!({
            "appointment_id": 42,
            "diagnosis": "Seasonal allergy"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": 5,
            "appointment_id": 42,
            "diagnosis": "Seasonal allergy",
            "created_at": "2026-10-20T10:00:00+00:00",
            "updated_at": "2026-10-20T10:00:00+00:00"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseMedicalRecordStore::new(client(&server));
    let upsert = store
        .upsert(
            42,
            RecordFields {
                diagnosis: Some("Seasonal allergy".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(upsert.created);
    assert_eq!(upsert.record.id, 5);
    assert_eq!(upsert.record.diagnosis.as_deref(), Some("Seasonal allergy"));
    assert_eq!(upsert.record.prescription, None);
}

#[tokio::test]
async fn listing_records_for_no_appointments_skips_the_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let store = SupabaseMedicalRecordStore::new(client(&server));
    assert!(store.list_for_appointments(&[]).await.unwrap().is_empty());
}
