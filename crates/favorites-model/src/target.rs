//! Insertion targets.

use std::fmt;

/// Wire value meaning "end of list".
pub const TAIL_SENTINEL: &str = "-1";

/// The entry before which an insert or move applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Past the last entry.
    Tail,
    /// Immediately before the entry with this id.
    Before(String),
}

impl Target {
    /// Parse a wire value; `"-1"` is the tail sentinel.
    pub fn parse(raw: &str) -> Self {
        if raw == TAIL_SENTINEL {
            Self::Tail
        } else {
            Self::Before(raw.to_string())
        }
    }

    /// The entry id, if this is not the tail.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Tail => None,
            Self::Before(id) => Some(id),
        }
    }
}

impl From<&str> for Target {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tail => f.write_str(TAIL_SENTINEL),
            Self::Before(id) => f.write_str(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sentinel() {
        assert_eq!(Target::parse("-1"), Target::Tail);
        assert_eq!(Target::parse("abc"), Target::Before("abc".to_string()));
        assert_eq!(Target::Tail.to_string(), "-1");
        assert_eq!(Target::from("x").id(), Some("x"));
        assert!(Target::Tail.id().is_none());
    }
}
