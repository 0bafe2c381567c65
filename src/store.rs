use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::models::ArrivalPrediction;

/// Append-only log of arrival predictions. Rows are inserted once and never
/// updated or deleted here; retention is handled elsewhere.
#[derive(Clone)]
pub struct PredictionStore {
    pool: SqlitePool,
}

impl PredictionStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS bus_arrivals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                stop_id INTEGER NOT NULL,
                stop_name TEXT NOT NULL,
                bus_id INTEGER NOT NULL,
                bus_number TEXT NOT NULL,
                route_id INTEGER NOT NULL,
                route_name TEXT NOT NULL,
                eta_minutes INTEGER NOT NULL,
                distance_km REAL NOT NULL,
                status TEXT NOT NULL,
                predicted_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append one prediction and return its assigned row id.
    pub async fn append(&self, prediction: &ArrivalPrediction) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO bus_arrivals (
                stop_id, stop_name, bus_id, bus_number, route_id, route_name,
                eta_minutes, distance_km, status, predicted_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(prediction.stop_id)
        .bind(&prediction.stop_name)
        .bind(prediction.bus_id)
        .bind(&prediction.bus_number)
        .bind(prediction.route_id)
        .bind(&prediction.route_name)
        .bind(prediction.eta_minutes)
        .bind(prediction.distance_km)
        .bind(prediction.status.as_str())
        .bind(prediction.predicted_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Cheap connectivity probe for the health endpoint.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
