use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::models::PlateText;

/// Outcome of checking one recognized plate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    NotFound,
    Authorized,
    Denied,
}

impl Decision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Decision::Authorized)
    }

    /// Human-readable status line
    pub fn description(&self) -> &'static str {
        match self {
            Decision::NotFound => "No plate detected",
            Decision::Authorized => "Access granted",
            Decision::Denied => "Access denied",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::NotFound => "NOT_FOUND",
            Decision::Authorized => "AUTHORIZED",
            Decision::Denied => "DENIED",
        };
        f.write_str(s)
    }
}

/// Plates permitted access. Fixed after construction.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationSet {
    plates: HashSet<String>,
}

impl AuthorizationSet {
    /// Entries are normalized like recognized text; entries that end up empty are dropped
    pub fn new<I, S>(plates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let plates = plates
            .into_iter()
            .map(|p| PlateText::from(p.as_ref()))
            .filter(|p| !p.is_empty())
            .map(|p| p.as_str().to_string())
            .collect();
        Self { plates }
    }

    /// Exact, case-sensitive membership
    pub fn contains(&self, plate: &str) -> bool {
        self.plates.contains(plate)
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }
}

/// Empty text is `NotFound`, a member is `Authorized`, anything else `Denied`
pub fn decide(text: &PlateText, authorized: &AuthorizationSet) -> Decision {
    if text.is_empty() {
        Decision::NotFound
    } else if authorized.contains(text.as_str()) {
        Decision::Authorized
    } else {
        Decision::Denied
    }
}
