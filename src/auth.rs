//! Access control for the panel.
//!
//! Privilege only decides what a viewer is shown; it never changes how the
//! indicators are computed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::UserEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeLevel {
    /// Sees organizational filters, breakdowns, late-case tables and export.
    #[serde(alias = "admin")]
    Elevated,
    #[serde(alias = "user")]
    Standard,
}

impl PrivilegeLevel {
    pub fn is_elevated(&self) -> bool {
        matches!(self, PrivilegeLevel::Elevated)
    }
}

/// Checks a username/password pair and returns the privilege it grants.
pub trait Authenticator {
    fn verify(&self, username: &str, password: &str) -> Option<PrivilegeLevel>;
}

/// Credential table loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, (String, PrivilegeLevel)>,
}

impl StaticCredentials {
    pub fn new(entries: &[UserEntry]) -> Self {
        let users = entries
            .iter()
            .map(|u| (u.username.clone(), (u.password.clone(), u.privilege)))
            .collect();
        Self { users }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Authenticator for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> Option<PrivilegeLevel> {
        match self.users.get(username) {
            Some((expected, privilege)) if expected == password => Some(*privilege),
            _ => None,
        }
    }
}

/// The logged-in viewer, passed explicitly wherever privilege matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub privilege: PrivilegeLevel,
}

impl Session {
    pub fn new(username: impl Into<String>, privilege: PrivilegeLevel) -> Self {
        Self {
            username: username.into(),
            privilege,
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.privilege.is_elevated()
    }
}

pub fn login(auth: &dyn Authenticator, username: &str, password: &str) -> Option<Session> {
    auth.verify(username, password)
        .map(|privilege| Session::new(username, privilege))
}
