//! Connection-related data models.
//!
//! This module defines the two logical database targets, their fixed
//! connection settings, and the lifecycle state of a connection handle.

use serde::{Deserialize, Serialize};

/// One of the two independently configured databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseTarget {
    Reporting,
    General,
}

impl DatabaseTarget {
    pub const ALL: [DatabaseTarget; 2] = [DatabaseTarget::Reporting, DatabaseTarget::General];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reporting => "reporting",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for one target, resolved at process start.
#[derive(Clone, PartialEq, Eq)]
pub struct TargetSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Sensitive - never log
    pub password: String,
    pub database: String,
}

impl TargetSettings {
    /// Display-safe description of the target (no credentials).
    pub fn describe(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl std::fmt::Debug for TargetSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("database", &self.database)
            .finish()
    }
}

/// Lifecycle of a connection handle.
///
/// `Uninitialized -> Connecting -> Ready` on the first successful use.
/// A failed attempt ends in `Failed`; the next use starts `Connecting` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Ready,
    Failed,
}

impl ConnectionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names() {
        assert_eq!(DatabaseTarget::Reporting.to_string(), "reporting");
        assert_eq!(DatabaseTarget::General.as_str(), "general");
    }

    #[test]
    fn test_settings_debug_masks_password() {
        let settings = TargetSettings {
            host: "localhost".to_string(),
            port: 5432,
            user: "agent".to_string(),
            password: "hunter2".to_string(),
            database: "reporting".to_string(),
        };
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("****"));
        assert_eq!(settings.describe(), "agent@localhost:5432/reporting");
    }
}
