use chrono::NaiveDateTime;
use serde::Deserialize;

/// Settings shared by every query issued through one database.
///
/// Deserializes from any serde format; missing fields take their defaults.
///
/// # Example
/// ```
/// use relq::DatabaseConfig;
///
/// let config = DatabaseConfig::default().batch_size(50);
/// assert_eq!(config.batch_size, 50);
/// assert_eq!(config.escape_sequence, "\\");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Statements sent per driver batch call
    pub batch_size: usize,
    /// Prefix used to escape LIKE wildcards
    pub escape_sequence: String,
    /// Attempts a table-based id generator makes before giving up
    pub table_generator_max_attempts: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            escape_sequence: "\\".to_string(),
            table_generator_max_attempts: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn escape_sequence(mut self, escape_sequence: impl Into<String>) -> Self {
        self.escape_sequence = escape_sequence.into();
        self
    }

    pub fn table_generator_max_attempts(mut self, attempts: u32) -> Self {
        self.table_generator_max_attempts = attempts.max(1);
        self
    }
}

/// Source of timestamps for created-at and updated-at columns.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
