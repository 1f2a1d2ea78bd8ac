use std::fmt;

use const_format::concatcp;

pub mod database;
mod data_manager;

pub use data_manager::*;

pub const DATA_DIR: &str = "data/";
pub const DATABASE_PATH: &str = concatcp!(DATA_DIR, "routes.db");

#[derive(Debug)]
pub enum DataManagerError {
    Database(String),
    NotFound(String),
}

impl fmt::Display for DataManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataManagerError::Database(msg) => write!(f, "database error: {msg}"),
            DataManagerError::NotFound(route_id) => write!(f, "no route with id {route_id}"),
        }
    }
}

impl std::error::Error for DataManagerError {}
