//! Weather record store
//!
//! Owns persistence of weather records. Every mutation is a single SQL
//! statement, so each operation commits or rolls back as a unit and no
//! partial row is ever visible.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool};

use crate::error::{StoreError, StoreResult};
use crate::validation;

/// Weather record service backed by the relational store
#[derive(Clone)]
pub struct WeatherService {
    db: PgPool,
}

/// A stored weather observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WeatherRecord {
    pub id: i32,
    pub city: String,
    pub temperature: Decimal,
    pub humidity: Decimal,
    pub description: String,
    #[serde(with = "timestamp_format")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp_format")]
    pub updated_at: DateTime<Utc>,
}

/// One page of records plus the listing totals
#[derive(Debug)]
pub struct PagedWeather {
    pub items: Vec<WeatherRecord>,
    pub total: i64,
    pub pages: i64,
}

impl WeatherService {
    /// Create a new WeatherService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Insert a new record from a raw creation payload.
    ///
    /// All four fields are required; temperature and humidity must convert
    /// to the fixed-point type. Conversion failures surface as
    /// [`StoreError::Validation`] naming the offending field.
    pub async fn create(&self, fields: &Map<String, Value>) -> StoreResult<WeatherRecord> {
        let city = validation::required_text(
            "city",
            validation::required_value(fields, "city")?,
            validation::CITY_MAX_LEN,
        )?;
        let temperature =
            validation::fixed_decimal("temperature", validation::required_value(fields, "temperature")?)?;
        let humidity =
            validation::fixed_decimal("humidity", validation::required_value(fields, "humidity")?)?;
        let description = validation::required_text(
            "description",
            validation::required_value(fields, "description")?,
            validation::DESCRIPTION_MAX_LEN,
        )?;

        let record = sqlx::query_as::<_, WeatherRecord>(
            r#"
            INSERT INTO weather (city, temperature, humidity, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, city, temperature, humidity, description, created_at, updated_at
            "#,
        )
        .bind(&city)
        .bind(temperature)
        .bind(humidity)
        .bind(&description)
        .fetch_one(&self.db)
        .await?;

        Ok(record)
    }

    /// Get a record by id.
    pub async fn get(&self, id: i32) -> StoreResult<WeatherRecord> {
        let record = sqlx::query_as::<_, WeatherRecord>(
            r#"
            SELECT id, city, temperature, humidity, description, created_at, updated_at
            FROM weather
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        Ok(record)
    }

    /// List every record in insertion order.
    pub async fn list_all(&self) -> StoreResult<Vec<WeatherRecord>> {
        let records = sqlx::query_as::<_, WeatherRecord>(
            r#"
            SELECT id, city, temperature, humidity, description, created_at, updated_at
            FROM weather
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }

    /// List one page of records.
    ///
    /// Pages are 1-indexed. A page past the end of the listing yields an
    /// empty item list rather than an error; page and limit below 1 are
    /// clamped to 1.
    pub async fn list_paged(&self, page: u32, limit: u32) -> StoreResult<PagedWeather> {
        let limit = i64::from(limit.max(1));
        let page = i64::from(page.max(1));
        let offset = (page - 1) * limit;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM weather")
            .fetch_one(&self.db)
            .await?;

        let items = sqlx::query_as::<_, WeatherRecord>(
            r#"
            SELECT id, city, temperature, humidity, description, created_at, updated_at
            FROM weather
            ORDER BY id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(PagedWeather {
            items,
            total,
            pages: page_count(total, limit),
        })
    }

    /// Apply a partial update to a record.
    ///
    /// Every key in `fields` must name a mutable attribute; the first
    /// unrecognized key rejects the whole update before the database is
    /// touched. On success all supplied fields are applied and `updated_at`
    /// is refreshed in the same statement.
    pub async fn update(&self, id: i32, fields: &Map<String, Value>) -> StoreResult<WeatherRecord> {
        if let Some(key) = validation::first_unknown_field(fields) {
            return Err(StoreError::InvalidField(key.to_string()));
        }

        let city = fields
            .get("city")
            .map(|value| validation::required_text("city", value, validation::CITY_MAX_LEN))
            .transpose()?;
        let temperature = fields
            .get("temperature")
            .map(|value| validation::fixed_decimal("temperature", value))
            .transpose()?;
        let humidity = fields
            .get("humidity")
            .map(|value| validation::fixed_decimal("humidity", value))
            .transpose()?;
        let description = fields
            .get("description")
            .map(|value| {
                validation::required_text("description", value, validation::DESCRIPTION_MAX_LEN)
            })
            .transpose()?;

        let record = sqlx::query_as::<_, WeatherRecord>(
            r#"
            UPDATE weather
            SET city = COALESCE($2, city),
                temperature = COALESCE($3, temperature),
                humidity = COALESCE($4, humidity),
                description = COALESCE($5, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, city, temperature, humidity, description, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&city)
        .bind(temperature)
        .bind(humidity)
        .bind(&description)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        Ok(record)
    }

    /// Delete a record by id.
    ///
    /// Returns true if a record existed and was removed. Deleting an absent
    /// id is not an error.
    pub async fn delete(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM weather WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Number of pages needed for `total` records at `limit` per page.
fn page_count(total: i64, limit: i64) -> i64 {
    (total + limit - 1) / limit
}

/// Timestamps travel as "YYYY-MM-DD HH:MM:SS" in responses and in the
/// cached listing payload.
mod timestamp_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let naive =
            NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)?;
        Ok(naive.and_utc())
    }
}
