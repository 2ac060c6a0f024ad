//! Customer records over PostgreSQL: clients and the phone numbers they own.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use db::CustomerStore;
pub use error::StoreError;
