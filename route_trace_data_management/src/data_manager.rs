use std::path::{Path, PathBuf};

use async_trait::async_trait;
use route_trace_lib::route_summary::CompletedRouteSummary;
use route_trace_session::{adapters::PersistenceSink, error::PersistenceError};

use crate::{database::db::RouteDatabase, DataManagerError, DATABASE_PATH, DATA_DIR};

#[derive(Clone)]
pub struct DataManager {
    pub(crate) database: RouteDatabase,
}

/// The public interface for storing completed routes.
impl DataManager {
    /// Opens the default database under the project's data directory.
    pub async fn start() -> Result<Self, DataManagerError> {
        let root: PathBuf = project_root::get_project_root()
            .map_err(|_| DataManagerError::Database("Failed to find project root".to_string()))?;

        // Create data dir if it doesn't exist
        let data_dir = root.join(DATA_DIR);
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir)
                .map_err(|_| DataManagerError::Database(format!("Failed to create data directory: {:?}", data_dir)))?;
        }

        Self::start_at(&root.join(DATABASE_PATH)).await
    }

    pub async fn start_at(path: &Path) -> Result<Self, DataManagerError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|_| DataManagerError::Database(format!("Failed to create directory: {:?}", parent)))?;
        }

        let database = RouteDatabase::connect(path).await?;
        tracing::info!("Route database at {}", path.display());

        Ok(DataManager {
            database,
        })
    }

    pub async fn in_memory() -> Result<Self, DataManagerError> {
        Ok(DataManager {
            database: RouteDatabase::connect_in_memory().await?,
        })
    }

    pub async fn save_completed_route(&self, summary: &CompletedRouteSummary) -> Result<(), DataManagerError> {
        self.database.insert_completed_route(summary).await
    }

    pub async fn get_completed_routes(&self) -> Result<Vec<CompletedRouteSummary>, DataManagerError> {
        self.database.get_completed_routes().await
    }

    pub async fn get_completed_route(&self, route_id: &str) -> Result<CompletedRouteSummary, DataManagerError> {
        self.database.get_completed_route(route_id).await
    }

    pub async fn delete_completed_route(&self, route_id: &str) -> Result<bool, DataManagerError> {
        self.database.delete_completed_route(route_id).await
    }
}

#[async_trait]
impl PersistenceSink for DataManager {
    async fn save_completed_route(&self, summary: &CompletedRouteSummary) -> Result<(), PersistenceError> {
        DataManager::save_completed_route(self, summary)
            .await
            .map_err(|err| PersistenceError(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use route_trace_lib::{coordinates::{coordinates, Coordinates}, stop::Stop};
    use route_trace_session::{adapters::{AddressResolver, OptimizeOptions, OptimizedRoute, RouteOptimizer}, AdapterError, SessionConfig, SessionRuntime};

    use super::*;

    struct NoNetwork;

    #[async_trait]
    impl AddressResolver for NoNetwork {
        async fn resolve(&self, _coordinates: Coordinates) -> Result<String, AdapterError> {
            Err(AdapterError::Unavailable)
        }
    }

    #[async_trait]
    impl RouteOptimizer for NoNetwork {
        async fn optimize(&self, _stops: &[Stop], _options: &OptimizeOptions) -> Result<OptimizedRoute, AdapterError> {
            Err(AdapterError::Unavailable)
        }
    }

    #[tokio::test]
    async fn completed_session_lands_in_database() {
        let data_manager = DataManager::in_memory().await.unwrap();
        let runtime = SessionRuntime::new(
            &SessionConfig::default(),
            Arc::new(NoNetwork),
            Arc::new(NoNetwork),
            Arc::new(data_manager.clone()),
        );

        runtime.start_tracing().unwrap();
        let stop = runtime.add_stop(coordinates(-46.63, -23.55), None, None).await.unwrap();
        assert_eq!(stop.address.as_deref(), Some("Lat: -23.5500, Lng: -46.6300"));
        runtime.show_trace_confirmation().unwrap();
        runtime.confirm_trace().unwrap();
        runtime.start_active_navigation().unwrap();
        runtime.complete_current_stop().unwrap();
        runtime.save_and_complete_route().unwrap();

        let mut routes = Vec::new();
        for _ in 0..50 {
            routes = data_manager.get_completed_routes().await.unwrap();
            if !routes.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].completed_stops, 1);
        assert_eq!(routes[0].stops[0].id, stop.id);
    }
}
