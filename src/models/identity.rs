use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A participant of the ledger.
/// Two identities with the same `unique_id` are the same party, whatever their display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub unique_id: String,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            display_name: None,
        }
    }

    pub fn with_name(unique_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            display_name: Some(display_name.into()),
        }
    }

    /// Returns the display name, or the id when no usable name is set.
    pub fn display_label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.unique_id,
        }
    }

    pub fn same_party(&self, other: &Identity) -> bool {
        self.unique_id == other.unique_id
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.unique_id == other.unique_id
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unique_id.hash(state);
    }
}

impl PartialOrd for Identity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// String comparison is byte-wise, which is the ordinal order pair keys rely on.
impl Ord for Identity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.unique_id.cmp(&other.unique_id)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_label())
    }
}
