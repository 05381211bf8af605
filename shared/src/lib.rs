//! Shared library for the academic calendar Lambda functions.
//!
//! This crate provides the event and semester operations, the method
//! dispatchers, and the item store they persist through.

pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod http;
pub mod models;
pub mod semesters;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use handlers::{handle_events, handle_semesters};
pub use models::{Event, Semester};
pub use state::AppState;
pub use store::{DynamoStore, ItemStore, MemoryStore};
