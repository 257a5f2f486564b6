//! File and folder authorization
//!
//! Paths are absolute, `/`-separated and relative to the I/O root. A path
//! ending in `/` is a folder, anything else is a file. All comparisons are
//! case-insensitive.
//!
//! [`PathAuthorizer`] applies these rules for every role except `root`, which
//! bypasses everything after the path sanity check:
//!
//! - other users' home folders (`/users/<name>/`) are never readable
//! - the data folder (default `/db/`), `.config` files and the auth file are
//!   never readable
//! - files and folders under the user's own home folder and `/common/` are
//!   always writable
//! - anything else is decided by the access rules, defaulting to allowed for
//!   reads and denied for writes

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Denied;

/// Identity of the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub username: String,
    pub role: String,
}

impl Ticket {
    pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.role == ROOT_ROLE
    }
}

impl Default for Ticket {
    fn default() -> Self {
        Self::new("guest", "guest")
    }
}

const ROOT_ROLE: &str = "root";

/// Decides whether a ticket may read or modify a path
pub trait Authorizer: Send + Sync {
    fn authorize_read(&self, ticket: &Ticket, path: &str) -> Result<(), Denied>;
    fn authorize_modify(&self, ticket: &Ticket, path: &str) -> Result<(), Denied>;
}

/* ===================== Access Rules ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Allow,
    Deny,
}

/// One `[[auth.access]]` entry
///
/// ```toml
/// [[auth.access]]
/// role = "*"
/// path = "/modules/"
/// access = "deny"
/// operation = "read"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    /// Role the rule applies to, or `*` for every role
    pub role: String,
    /// Path prefix the rule applies to
    pub path: String,
    pub access: Access,
    pub operation: Operation,
}

impl AccessRule {
    pub fn new(
        role: impl Into<String>,
        path: impl Into<String>,
        access: Access,
        operation: Operation,
    ) -> Self {
        Self {
            role: role.into(),
            path: path.into(),
            access,
            operation,
        }
    }

    fn applies_to(&self, role: &str, operation: Operation, path: &str) -> bool {
        (self.role == "*" || self.role == role)
            && self.operation == operation
            && starts_with(path, &self.path)
    }
}

/* ===================== Path Authorizer ===================== */

/// Rule-based [`Authorizer`]
#[derive(Debug, Clone)]
pub struct PathAuthorizer {
    data_path: String,
    auth_file: String,
    rules: Vec<AccessRule>,
}

impl Default for PathAuthorizer {
    fn default() -> Self {
        Self::new("/db/", "/auth.hl", Vec::new())
    }
}

impl PathAuthorizer {
    pub fn new(
        data_path: impl Into<String>,
        auth_file: impl Into<String>,
        rules: Vec<AccessRule>,
    ) -> Self {
        Self {
            data_path: data_path.into(),
            auth_file: auth_file.into(),
            rules,
        }
    }

    fn read_file(&self, ticket: &Ticket, path: &str) -> bool {
        if starts_with(path, "/users/") && !starts_with(path, &home_folder(ticket)) {
            return false;
        }
        if starts_with(path, &self.data_path) {
            return false;
        }
        let is_config = Path::new(path)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("config"))
            .unwrap_or(false);
        if is_config {
            return false;
        }
        if path.eq_ignore_ascii_case(&self.auth_file) {
            return false;
        }
        self.check_rules(ticket, path, Operation::Read, true)
    }

    fn read_folder(&self, ticket: &Ticket, path: &str) -> bool {
        if starts_with(path, "/users/")
            && path.len() > "/users/".len()
            && !starts_with(path, &home_folder(ticket))
        {
            return false;
        }
        if starts_with(path, &self.data_path) {
            return false;
        }
        self.check_rules(ticket, path, Operation::Read, true)
    }

    fn modify(&self, ticket: &Ticket, path: &str) -> bool {
        if starts_with(path, &home_folder(ticket)) || starts_with(path, "/common/") {
            return true;
        }
        self.check_rules(ticket, path, Operation::Write, false)
    }

    /// Apply the matching rules in order; the last one decides
    ///
    /// Rules sort by path, with `*` rules before role-specific ones on the
    /// same path, so the most specific rule ends up last.
    fn check_rules(&self, ticket: &Ticket, path: &str, operation: Operation, default: bool) -> bool {
        let mut matching: Vec<&AccessRule> = self
            .rules
            .iter()
            .filter(|rule| rule.applies_to(&ticket.role, operation, path))
            .collect();

        matching.sort_by(|lhs, rhs| {
            lhs.path
                .to_lowercase()
                .cmp(&rhs.path.to_lowercase())
                .then_with(|| (lhs.role != "*").cmp(&(rhs.role != "*")))
        });

        matching
            .last()
            .map(|rule| rule.access == Access::Allow)
            .unwrap_or(default)
    }
}

impl Authorizer for PathAuthorizer {
    fn authorize_read(&self, ticket: &Ticket, path: &str) -> Result<(), Denied> {
        let folder = path.ends_with('/');
        check_sane(path, folder)?;
        if ticket.is_root() {
            return Ok(());
        }

        let allowed = if folder {
            self.read_folder(ticket, path)
        } else {
            self.read_file(ticket, path)
        };
        if allowed {
            Ok(())
        } else {
            debug!(path, role = %ticket.role, "read denied");
            Err(off_limits(path, folder))
        }
    }

    fn authorize_modify(&self, ticket: &Ticket, path: &str) -> Result<(), Denied> {
        let folder = path.ends_with('/');
        check_sane(path, folder)?;
        if ticket.is_root() {
            return Ok(());
        }

        if self.modify(ticket, path) {
            Ok(())
        } else {
            debug!(path, role = %ticket.role, "modify denied");
            Err(off_limits(path, folder))
        }
    }
}

fn check_sane(path: &str, folder: bool) -> Result<(), Denied> {
    let sane = path.starts_with('/')
        && !path.contains("//")
        && !path.contains('\\')
        && !path.contains("..");
    if sane {
        return Ok(());
    }
    let kind = if folder { "folder" } else { "file" };
    Err(Denied::new(
        path,
        format!("path '{}' is not a valid {} path", path, kind),
    ))
}

fn off_limits(path: &str, folder: bool) -> Denied {
    let kind = if folder { "folder" } else { "file" };
    Denied::new(path, format!("{} '{}' is off limits", kind, path))
}

fn home_folder(ticket: &Ticket) -> String {
    format!("/users/{}/", ticket.username)
}

fn starts_with(path: &str, prefix: &str) -> bool {
    path.len() >= prefix.len()
        && path
            .get(..prefix.len())
            .map(|head| head.eq_ignore_ascii_case(prefix))
            .unwrap_or(false)
}
