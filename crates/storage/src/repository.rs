//! Repository Implementation

use crate::StorageError;
use alerting::{Alert, AlertLevel};
use chrono::{DateTime, Utc};
use data_validator::SensorReading;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info};

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS sensor_readings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp_ns INTEGER NOT NULL,
        sensor_id TEXT NOT NULL,
        intersection_id TEXT,
        speed_avg REAL NOT NULL DEFAULT 0,
        vehicle_count INTEGER NOT NULL DEFAULT 0,
        raw_payload TEXT NOT NULL DEFAULT '{}'
    )",
    "CREATE INDEX IF NOT EXISTS idx_sensor_readings_timestamp ON sensor_readings (timestamp_ns)",
    "CREATE TABLE IF NOT EXISTS alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at_ns INTEGER NOT NULL,
        level TEXT NOT NULL DEFAULT 'INFO',
        message TEXT NOT NULL,
        intersection_id TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_alerts_created_at ON alerts (created_at_ns)",
];

/// Stored alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub level: AlertLevel,
    pub message: String,
    pub intersection_id: Option<String>,
}

/// Aggregate view over all stored readings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_readings: i64,
    pub avg_speed: f64,
    pub avg_vehicle_count: f64,
}

/// Repository for sensor readings and alerts
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Connect to the SQLite database at `url`, creating it and its tables
    /// if missing
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        info!("Connecting to database {}", url);
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Create a private in-memory database
    pub async fn in_memory() -> Result<Self, StorageError> {
        debug!("Creating in-memory repository");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Each connection to :memory: is its own database, so keep exactly one
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Insert a sensor reading
    pub async fn insert_reading(&self, reading: &SensorReading) -> Result<i64, StorageError> {
        let raw_payload = serde_json::to_string(&reading.raw_payload)?;
        let id = sqlx::query(
            "INSERT INTO sensor_readings
                (timestamp_ns, sensor_id, intersection_id, speed_avg, vehicle_count, raw_payload)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(to_nanos(&reading.timestamp)?)
        .bind(&reading.sensor_id)
        .bind(reading.intersection_id.as_deref())
        .bind(reading.speed_avg)
        .bind(i64::from(reading.vehicle_count))
        .bind(raw_payload)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        debug!("Inserted reading {} from sensor {}", id, reading.sensor_id);
        Ok(id)
    }

    /// Get the reading with the latest timestamp
    pub async fn latest_reading(&self) -> Result<Option<SensorReading>, StorageError> {
        let row = sqlx::query(
            "SELECT timestamp_ns, sensor_id, intersection_id, speed_avg, vehicle_count, raw_payload
             FROM sensor_readings
             ORDER BY timestamp_ns DESC, id DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(reading_from_row).transpose()
    }

    /// Get total reading count
    pub async fn reading_count(&self) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS total FROM sensor_readings")
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;
        Ok(count)
    }

    /// Insert an alert
    pub async fn insert_alert(&self, alert: &Alert) -> Result<i64, StorageError> {
        let id = sqlx::query(
            "INSERT INTO alerts (created_at_ns, level, message, intersection_id)
             VALUES (?, ?, ?, ?)",
        )
        .bind(to_nanos(&alert.created_at)?)
        .bind(alert.level.as_str())
        .bind(&alert.message)
        .bind(alert.intersection_id.as_deref())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        debug!("Inserted alert {} ({})", id, alert.level);
        Ok(id)
    }

    /// Get the most recent alerts, newest first
    pub async fn recent_alerts(&self, limit: usize) -> Result<Vec<AlertRecord>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT id, created_at_ns, level, message, intersection_id
             FROM alerts
             ORDER BY created_at_ns DESC, id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(alert_from_row).collect()
    }

    /// Aggregate statistics across all readings
    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, StorageError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COALESCE(AVG(speed_avg), 0.0) AS avg_speed,
                    COALESCE(AVG(vehicle_count), 0.0) AS avg_count
             FROM sensor_readings",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardSummary {
            total_readings: row.try_get("total")?,
            avg_speed: round3(row.try_get("avg_speed")?),
            avg_vehicle_count: round3(row.try_get("avg_count")?),
        })
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn reading_from_row(row: &SqliteRow) -> Result<SensorReading, StorageError> {
    let vehicle_count: i64 = row.try_get("vehicle_count")?;
    let raw_payload: String = row.try_get("raw_payload")?;
    let raw_payload: BTreeMap<String, f64> = serde_json::from_str(&raw_payload)?;

    Ok(SensorReading {
        timestamp: DateTime::from_timestamp_nanos(row.try_get("timestamp_ns")?),
        sensor_id: row.try_get("sensor_id")?,
        intersection_id: row.try_get("intersection_id")?,
        speed_avg: row.try_get("speed_avg")?,
        vehicle_count: u32::try_from(vehicle_count).map_err(|_| {
            StorageError::SerializationError(format!("vehicle_count {} out of range", vehicle_count))
        })?,
        raw_payload,
    })
}

fn alert_from_row(row: &SqliteRow) -> Result<AlertRecord, StorageError> {
    let level: String = row.try_get("level")?;
    Ok(AlertRecord {
        id: row.try_get("id")?,
        created_at: DateTime::from_timestamp_nanos(row.try_get("created_at_ns")?),
        level: level
            .parse()
            .map_err(|e: alerting::ParseLevelError| StorageError::SerializationError(e.to_string()))?,
        message: row.try_get("message")?,
        intersection_id: row.try_get("intersection_id")?,
    })
}

/// Timestamps are stored as Unix nanoseconds; representable years are 1677 to 2262
fn to_nanos(timestamp: &DateTime<Utc>) -> Result<i64, StorageError> {
    timestamp.timestamp_nanos_opt().ok_or_else(|| {
        StorageError::SerializationError(format!("timestamp {} out of range", timestamp))
    })
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn reading(minute: u32, speed_avg: f64, vehicle_count: u32) -> SensorReading {
        SensorReading {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 8, minute, 0).unwrap(),
            sensor_id: format!("loop-{}", minute),
            intersection_id: Some("5th-and-main".to_string()),
            speed_avg,
            vehicle_count,
            raw_payload: BTreeMap::new(),
        }
    }

    fn alert(offset_secs: i64, message: &str) -> Alert {
        Alert {
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::seconds(offset_secs),
            level: AlertLevel::Warn,
            message: message.to_string(),
            intersection_id: None,
        }
    }

    #[tokio::test]
    async fn test_reading_insert_and_latest() {
        let repo = Repository::in_memory().await.unwrap();

        let mut late = reading(30, 22.5, 64);
        late.raw_payload.insert("occupancy".to_string(), 0.71);
        repo.insert_reading(&late).await.unwrap();
        repo.insert_reading(&reading(10, 40.0, 12)).await.unwrap();

        let latest = repo.latest_reading().await.unwrap().unwrap();
        assert_eq!(latest, late);
        assert_eq!(repo.reading_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sub_millisecond_timestamp_preserved() {
        let repo = Repository::in_memory().await.unwrap();

        let mut first = reading(5, 30.0, 20);
        first.timestamp = first.timestamp + Duration::nanoseconds(1_000_400);
        let mut second = reading(5, 31.0, 21);
        second.timestamp = second.timestamp + Duration::nanoseconds(1_000_700);
        repo.insert_reading(&second).await.unwrap();
        repo.insert_reading(&first).await.unwrap();

        let latest = repo.latest_reading().await.unwrap().unwrap();
        assert_eq!(latest, second);
        assert_eq!(latest.timestamp.timestamp_subsec_nanos(), 1_000_700);
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp_rejected() {
        let repo = Repository::in_memory().await.unwrap();
        let mut ancient = reading(0, 10.0, 1);
        ancient.timestamp = Utc.with_ymd_and_hms(1500, 1, 1, 0, 0, 0).unwrap();
        let result = repo.insert_reading(&ancient).await;
        assert!(matches!(result, Err(StorageError::SerializationError(_))));
        assert_eq!(repo.reading_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_latest_reading_empty() {
        let repo = Repository::in_memory().await.unwrap();
        assert!(repo.latest_reading().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_alerts_newest_first() {
        let repo = Repository::in_memory().await.unwrap();
        let first = repo.insert_alert(&alert(0, "High vehicle count 81")).await.unwrap();
        let second = repo.insert_alert(&alert(60, "High vehicle count 95")).await.unwrap();
        repo.insert_alert(&alert(30, "High vehicle count 88")).await.unwrap();
        assert_eq!((first, second), (1, 2));

        let alerts = repo.recent_alerts(2).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].message, "High vehicle count 95");
        assert_eq!(alerts[1].message, "High vehicle count 88");
        assert_eq!(alerts[0].level, AlertLevel::Warn);
    }

    #[tokio::test]
    async fn test_dashboard_summary() {
        let repo = Repository::in_memory().await.unwrap();
        assert_eq!(repo.dashboard_summary().await.unwrap(), DashboardSummary::default());

        repo.insert_reading(&reading(1, 10.0, 10)).await.unwrap();
        repo.insert_reading(&reading(2, 20.0, 20)).await.unwrap();
        repo.insert_reading(&reading(3, 25.0, 31)).await.unwrap();

        let summary = repo.dashboard_summary().await.unwrap();
        assert_eq!(summary.total_readings, 3);
        assert_eq!(summary.avg_speed, 18.333);
        assert_eq!(summary.avg_vehicle_count, 20.333);
    }
}
