//! Configuration management for Lambda functions.

use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Events table name
    pub events_table: String,
    /// Semesters table name
    pub semesters_table: String,
    /// Events GSI on `Date`
    pub date_index: String,
    /// Events GSI on `semesterId`
    pub semester_index: String,
    /// Events GSI on `Title`
    pub title_index: String,
    /// AWS region
    pub aws_region: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            events_table: "Events".to_string(),
            semesters_table: "Semesters".to_string(),
            date_index: "DateIndex".to_string(),
            semester_index: "SemesterIndex".to_string(),
            title_index: "TitleIndex".to_string(),
            aws_region: "us-east-1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// table and index names the service was deployed with.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            events_table: env::var("EVENTS_TABLE").unwrap_or(defaults.events_table),
            semesters_table: env::var("SEMESTERS_TABLE").unwrap_or(defaults.semesters_table),
            date_index: env::var("EVENTS_DATE_INDEX").unwrap_or(defaults.date_index),
            semester_index: env::var("EVENTS_SEMESTER_INDEX").unwrap_or(defaults.semester_index),
            title_index: env::var("EVENTS_TITLE_INDEX").unwrap_or(defaults.title_index),
            aws_region: env::var("AWS_REGION").unwrap_or(defaults.aws_region),
        }
    }
}
