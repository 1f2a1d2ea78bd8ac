use std::{path::Path, str::FromStr};

use const_format::concatcp;
use route_trace_lib::route_summary::CompletedRouteSummary;
use sqlx::{query, query_as, sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Executor, Pool, Sqlite, SqlitePool};

use crate::DataManagerError;

use super::constants::*;

#[derive(Clone)]
pub struct RouteDatabase {
    pool: Pool<Sqlite>,
}

impl RouteDatabase {
    pub async fn connect(path: &Path) -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await
            .map_err(|_| DataManagerError::Database(format!("Failed to connect to database at {}", path.display())))?;

        let db = Self {
            pool
        };

        db.init().await?;

        Ok(db)
    }

    /// A private database that lives as long as the returned handle.
    pub async fn connect_in_memory() -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|_| DataManagerError::Database("Invalid in-memory database options".to_string()))?;

        // Every connection would get its own memory database, so keep exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options).await
            .map_err(|_| DataManagerError::Database("Failed to open in-memory database".to_string()))?;

        let db = Self {
            pool
        };

        db.init().await?;

        Ok(db)
    }

    pub async fn init(&self) -> Result<(), DataManagerError> {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", COMPLETED_ROUTES_TABLE_NAME, "(",
                ROUTE_ID,          " TEXT PRIMARY KEY,",
                COMPLETED_AT,      " TIMESTAMP NOT NULL,",
                ROUTE_TYPE,        " TEXT,",
                TOTAL_STOPS,       " INTEGER NOT NULL,",
                COMPLETED_STOPS,   " INTEGER NOT NULL,",
                TOTAL_DISTANCE,    " REAL NOT NULL,",
                ESTIMATED_CREDITS, " INTEGER NOT NULL,",
                SUMMARY,           " BLOB NOT NULL
            )")).await
            .map_err(|_| DataManagerError::Database("Failed to create tables".to_string()))
            .map(|_| ())
    }

    pub async fn insert_completed_route(&self, summary: &CompletedRouteSummary) -> Result<(), DataManagerError> {
        let blob = summary.to_blob()
            .map_err(|err| DataManagerError::Database(format!("Failed to encode route {}: {err}", summary.route_id)))?;

        query(concatcp!("
            INSERT INTO ", COMPLETED_ROUTES_TABLE_NAME, "(",
            ROUTE_ID, ", ", COMPLETED_AT, ", ", ROUTE_TYPE, ", ", TOTAL_STOPS, ", ", COMPLETED_STOPS, ", ",
            TOTAL_DISTANCE, ", ", ESTIMATED_CREDITS, ", ", SUMMARY, ")
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"))
                .bind(&summary.route_id)
                .bind(summary.completed_at)
                .bind(summary.route_type.map(|route_type| route_type.as_str()))
                .bind(summary.total_stops as i64)
                .bind(summary.completed_stops as i64)
                .bind(summary.navigation_data.total_distance_meters)
                .bind(summary.estimated_credits)
                .bind(blob)
                .execute(&self.pool).await
                .map_err(|_| DataManagerError::Database(format!("Failed to insert route {}", summary.route_id)))
                .map(|_| ())
    }

    /// Newest first.
    pub async fn get_completed_routes(&self) -> Result<Vec<CompletedRouteSummary>, DataManagerError> {
        query_as::<_, CompletedRouteSummary>(concatcp!("SELECT ", SUMMARY, " FROM ", COMPLETED_ROUTES_TABLE_NAME, " ORDER BY ", COMPLETED_AT, " DESC"))
            .fetch_all(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to get completed routes".to_string()))
    }

    pub async fn get_completed_route(&self, route_id: &str) -> Result<CompletedRouteSummary, DataManagerError> {
        query_as::<_, CompletedRouteSummary>(concatcp!("SELECT ", SUMMARY, " FROM ", COMPLETED_ROUTES_TABLE_NAME, " WHERE ", ROUTE_ID, " = ?1"))
            .bind(route_id)
            .fetch_optional(&self.pool).await
            .map_err(|_| DataManagerError::Database(format!("Failed to get route {route_id}")))?
            .ok_or_else(|| DataManagerError::NotFound(route_id.to_string()))
    }

    pub async fn delete_completed_route(&self, route_id: &str) -> Result<bool, DataManagerError> {
        query(concatcp!("DELETE FROM ", COMPLETED_ROUTES_TABLE_NAME, " WHERE ", ROUTE_ID, " = ?1"))
            .bind(route_id)
            .execute(&self.pool).await
            .map_err(|_| DataManagerError::Database(format!("Failed to delete route {route_id}")))
            .map(|result| result.rows_affected() > 0)
    }
}
