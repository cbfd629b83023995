// Module stations - PostgreSQL-backed fuel station storage and lookup

use std::collections::HashSet;
use std::env;
use std::io::Read;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::Coordinate;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, QueryBuilder};

use crate::corridor::{BoundingBox, MAX_CANDIDATE_STATIONS};

/// Station store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Invalid station data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Fuel station row model (DB representation). Only stations with both
/// coordinates set are usable by the optimizer.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FuelStation {
    pub id: i32,
    pub opis_id: i32,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub rack_id: i32,
    pub retail_price: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub imported_at: DateTime<Utc>,
}

impl FuelStation {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate { lat, lon }),
            _ => None,
        }
    }
}

/// Station totals reported by the health endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StationCounts {
    pub total: i64,
    pub geocoded: i64,
}

/// Price-ordered station lookup over a geographic bounding box.
///
/// Implementations must return only stations with both coordinates set,
/// sorted ascending by retail price and capped at
/// [`MAX_CANDIDATE_STATIONS`].
#[async_trait]
pub trait StationStore: Send + Sync {
    async fn stations_in_bounds(&self, bounds: &BoundingBox) -> Result<Vec<FuelStation>, StoreError>;

    async fn station_counts(&self) -> Result<StationCounts, StoreError>;
}

/// A station entry as found in the import export file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationRecord {
    pub opis_id: i32,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub rack_id: i32,
    pub retail_price: f64,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Parse a JSON array of station records, trimming text fields, skipping
/// malformed entries, and dropping duplicate (opis_id, name, retail_price)
/// triples.
pub fn parse_station_records(reader: impl Read) -> Result<Vec<StationRecord>, StoreError> {
    let raw: Vec<serde_json::Value> = serde_json::from_reader(reader)
        .map_err(|e| StoreError::InvalidData(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(raw.len());
    let mut skipped = 0usize;

    for value in raw {
        let Ok(mut record) = serde_json::from_value::<StationRecord>(value) else {
            skipped += 1;
            continue;
        };
        if !record.retail_price.is_finite() || record.retail_price < 0.0 {
            skipped += 1;
            continue;
        }

        record.name = record.name.trim().to_string();
        record.address = record.address.trim().to_string();
        record.city = record.city.trim().to_string();
        record.state = record.state.trim().to_string();

        let key = (
            record.opis_id,
            record.name.clone(),
            record.retail_price.to_bits(),
        );
        if !seen.insert(key) {
            continue;
        }

        records.push(record);
    }

    if skipped > 0 {
        tracing::warn!("skipped {skipped} malformed station entries");
    }

    Ok(records)
}

const INSERT_BATCH_SIZE: usize = 1_000;

/// PostgreSQL station store
pub struct PgStationStore {
    pool: PgPool,
}

impl PgStationStore {
    /// Connect using the DATABASE_URL environment variable.
    ///
    /// # Errors
    /// Returns StoreError if DATABASE_URL is not set or the connection fails
    pub async fn connect() -> Result<Self, StoreError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| {
            StoreError::Config("DATABASE_URL environment variable not set".to_string())
        })?;
        Self::from_url(&database_url).await
    }

    pub async fn from_url(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool created");

        Ok(Self { pool })
    }

    /// Run database migrations
    ///
    /// # Errors
    /// Returns StoreError if migration fails
    pub async fn migrate(&self) -> Result<(), StoreError> {
        // SQLx query() cannot handle multiple statements, so we use raw SQL
        let mut conn = self.pool.acquire().await?;

        let migration_sql = include_str!("../migrations/20250415_create_fuel_stations.sql");

        sqlx::raw_sql(migration_sql).execute(&mut *conn).await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Replace the whole station table with the given records, inserting in
    /// batches. Returns the number of stations inserted.
    pub async fn replace_all(&self, records: &[StationRecord]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM fuel_stations")
            .execute(&mut *tx)
            .await?;

        for chunk in records.chunks(INSERT_BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
                "INSERT INTO fuel_stations \
                 (opis_id, name, address, city, state, rack_id, retail_price, latitude, longitude) ",
            );
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.opis_id)
                    .push_bind(&record.name)
                    .push_bind(&record.address)
                    .push_bind(&record.city)
                    .push_bind(&record.state)
                    .push_bind(record.rack_id)
                    .push_bind(record.retail_price)
                    .push_bind(record.latitude)
                    .push_bind(record.longitude);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        tracing::info!("Imported {} fuel stations", records.len());
        Ok(records.len() as u64)
    }

    /// Stations still missing coordinates, oldest id first. `limit <= 0`
    /// means no limit.
    pub async fn stations_missing_coordinates(
        &self,
        limit: i64,
    ) -> Result<Vec<FuelStation>, StoreError> {
        let effective_limit = if limit > 0 { limit } else { i64::MAX };
        let stations = sqlx::query_as::<_, FuelStation>(
            "SELECT * FROM fuel_stations \
             WHERE latitude IS NULL OR longitude IS NULL \
             ORDER BY id \
             LIMIT $1",
        )
        .bind(effective_limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(stations)
    }

    pub async fn set_coordinates(&self, id: i32, lat: f64, lon: f64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE fuel_stations SET latitude = $2, longitude = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(lat)
        .bind(lon)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::InvalidData(format!("no station with id {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl StationStore for PgStationStore {
    async fn stations_in_bounds(&self, bounds: &BoundingBox) -> Result<Vec<FuelStation>, StoreError> {
        let stations = sqlx::query_as::<_, FuelStation>(
            "SELECT * FROM fuel_stations \
             WHERE latitude IS NOT NULL AND longitude IS NOT NULL \
               AND latitude >= $1 AND latitude <= $2 \
               AND longitude >= $3 AND longitude <= $4 \
             ORDER BY retail_price \
             LIMIT $5",
        )
        .bind(bounds.min_lat)
        .bind(bounds.max_lat)
        .bind(bounds.min_lon)
        .bind(bounds.max_lon)
        .bind(MAX_CANDIDATE_STATIONS)
        .fetch_all(&self.pool)
        .await?;

        Ok(stations)
    }

    async fn station_counts(&self) -> Result<StationCounts, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fuel_stations")
            .fetch_one(&self.pool)
            .await?;
        let geocoded: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fuel_stations \
             WHERE latitude IS NOT NULL AND longitude IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StationCounts { total, geocoded })
    }
}
