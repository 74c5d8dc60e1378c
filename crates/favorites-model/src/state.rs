//! Entry state flags.
//!
//! The active state is the empty set; it is never stored as a token.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single state flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateFlag {
    Deleted,
    Inactive,
    NoAccess,
}

impl StateFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deleted => "DELETED",
            Self::Inactive => "INACTIVE",
            Self::NoAccess => "NOACCESS",
        }
    }

    /// Parse a wire token, case-insensitively.
    ///
    /// Returns `None` for `ACTIVE`, `NORMAL`, the empty string and unknown
    /// tokens.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "DELETED" => Some(Self::Deleted),
            "INACTIVE" => Some(Self::Inactive),
            "NOACCESS" => Some(Self::NoAccess),
            _ => None,
        }
    }
}

impl fmt::Display for StateFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StateFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StateFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        StateFlag::from_token(&token)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown state {}", token)))
    }
}

/// Ordered set of state flags with idempotent set/clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSet(Vec<StateFlag>);

impl StateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, flag: StateFlag) -> bool {
        self.0.contains(&flag)
    }

    /// Add `flag`; returns whether the set changed.
    pub fn insert(&mut self, flag: StateFlag) -> bool {
        if self.contains(flag) {
            return false;
        }
        self.0.push(flag);
        true
    }

    /// Remove `flag`; returns whether the set changed.
    pub fn remove(&mut self, flag: StateFlag) -> bool {
        let before = self.0.len();
        self.0.retain(|f| *f != flag);
        self.0.len() != before
    }

    /// Single-slot replacement used for people entries: the first slot is
    /// overwritten, `None` clears the set.
    pub fn set_single(&mut self, flag: Option<StateFlag>) -> bool {
        let next = match flag {
            Some(flag) => {
                let mut next = self.0.clone();
                match next.first_mut() {
                    Some(first) => *first = flag,
                    None => next.push(flag),
                }
                let mut seen = Vec::with_capacity(next.len());
                next.retain(|f| {
                    if seen.contains(f) {
                        false
                    } else {
                        seen.push(*f);
                        true
                    }
                });
                next
            }
            None => Vec::new(),
        };
        let changed = next != self.0;
        self.0 = next;
        changed
    }

    pub fn first(&self) -> Option<StateFlag> {
        self.0.first().copied()
    }

    /// True when no flag is set.
    pub fn is_active(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = StateFlag> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<StateFlag> for StateSet {
    fn from_iter<I: IntoIterator<Item = StateFlag>>(iter: I) -> Self {
        let mut set = StateSet::new();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl fmt::Display for StateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.0.iter().map(StateFlag::as_str).collect();
        write!(f, "[{}]", tokens.join(","))
    }
}

impl Serialize for StateSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(StateFlag::as_str))
    }
}

impl<'de> Deserialize<'de> for StateSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tokens = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(tokens
            .iter()
            .filter_map(|token| StateFlag::from_token(token))
            .collect())
    }
}
