//! Repository integration tests against a real PostgreSQL instance.
//!
//! Run with `DATABASE_URL` pointing at a scratch server and
//! `cargo test -p envmon-db -- --ignored`.

use chrono::{Duration, Utc};
use envmon_core::alert::AlertType;
use envmon_db::models::alert_event::CreateAlertEvent;
use envmon_db::models::reading::CreateReading;
use envmon_db::repositories::{AlertEventRepo, ReadingRepo};
use sqlx::PgPool;

fn reading(device_id: &str, temperature: Option<f64>, humidity: Option<f64>) -> CreateReading {
    CreateReading {
        device_id: device_id.to_string(),
        temperature,
        humidity,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn insert_assigns_id_and_timestamp(pool: PgPool) {
    let before = Utc::now() - Duration::seconds(5);
    let row = ReadingRepo::insert(&pool, &reading("esp32-01", Some(21.5), None))
        .await
        .expect("insert should succeed");

    assert!(row.id > 0);
    assert_eq!(row.device_id, "esp32-01");
    assert_eq!(row.temperature, Some(21.5));
    assert_eq!(row.humidity, None);
    assert!(row.created_at >= before);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn insert_without_metrics_violates_check(pool: PgPool) {
    let result = ReadingRepo::insert(&pool, &reading("esp32-01", None, None)).await;
    assert!(result.is_err(), "CHECK constraint should reject metric-less rows");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn list_recent_is_newest_first_and_scoped(pool: PgPool) {
    for t in [20.0, 21.0, 22.0] {
        ReadingRepo::insert(&pool, &reading("esp32-01", Some(t), None))
            .await
            .unwrap();
    }
    ReadingRepo::insert(&pool, &reading("esp32-02", Some(99.0), None))
        .await
        .unwrap();

    let rows = ReadingRepo::list_recent(&pool, "esp32-01", 2).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].temperature, Some(22.0));
    assert_eq!(rows[1].temperature, Some(21.0));
    assert!(rows.iter().all(|r| r.device_id == "esp32-01"));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn find_latest_alert_filters_by_device_and_type(pool: PgPool) {
    let now = Utc::now();
    let older = CreateAlertEvent {
        device_id: "esp32-01".into(),
        alert_type: AlertType::TemperatureHigh,
        temperature: Some(45.0),
        humidity: None,
        created_at: now - Duration::minutes(30),
    };
    let newer = CreateAlertEvent {
        created_at: now - Duration::minutes(1),
        temperature: Some(47.0),
        ..older.clone()
    };
    let humidity = CreateAlertEvent {
        alert_type: AlertType::HumidityHigh,
        temperature: None,
        humidity: Some(95.0),
        created_at: now,
        ..older.clone()
    };
    for event in [&older, &newer, &humidity] {
        AlertEventRepo::insert(&pool, event).await.unwrap();
    }

    let latest = AlertEventRepo::find_latest(&pool, "esp32-01", AlertType::TemperatureHigh)
        .await
        .unwrap()
        .expect("an alert should exist");
    assert_eq!(latest.temperature, Some(47.0));
    assert_eq!(latest.kind(), Ok(AlertType::TemperatureHigh));

    let none = AlertEventRepo::find_latest(&pool, "esp32-02", AlertType::TemperatureHigh)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn health_check_passes(pool: PgPool) {
    envmon_db::health_check(&pool).await.unwrap();
}
