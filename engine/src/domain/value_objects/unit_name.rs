//! Normalized systemd service unit name

use crate::domain::constants::SERVICE_SUFFIX;
use std::fmt;

/// A unit name that always ends in `.service`
///
/// Callers may pass either `foo` or `foo.service`; both normalize to the
/// same value, and normalizing twice is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitName(String);

impl UnitName {
    pub fn new(name: &str) -> Self {
        Self(normalize(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory holding drop-in fragments for this unit
    pub fn drop_in_dir_name(&self) -> String {
        format!("{}.d", self.0)
    }
}

/// Append `.service` unless the name already carries it
pub fn normalize(name: &str) -> String {
    if name.ends_with(SERVICE_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{SERVICE_SUFFIX}")
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for UnitName {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl AsRef<str> for UnitName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
