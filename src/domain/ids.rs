use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque component identifier, unique for the lifetime of an editing session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ComponentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hands out session-scoped ids of the form `<prefix>-<session>-<n>`.
///
/// The session tag keeps ids minted in one session from colliding with
/// markers persisted by an earlier one; the counter is never rewound.
#[derive(Debug)]
pub struct IdAllocator {
    prefix: String,
    session: String,
    issued: u64,
}

impl IdAllocator {
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut session = Uuid::new_v4().simple().to_string();
        session.truncate(8);
        Self {
            prefix: prefix.into(),
            session,
            issued: 0,
        }
    }

    pub fn allocate(&mut self) -> ComponentId {
        self.issued += 1;
        ComponentId(format!("{}-{}-{}", self.prefix, self.session, self.issued))
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn sequential_ids_are_distinct() {
        let mut ids = IdAllocator::new("cmp");
        let issued: HashSet<ComponentId> = (0..500).map(|_| ids.allocate()).collect();
        assert_eq!(issued.len(), 500);
        assert_eq!(ids.issued(), 500);
    }

    #[test]
    fn separate_sessions_do_not_collide() {
        let mut first = IdAllocator::new("cmp");
        let mut second = IdAllocator::new("cmp");
        assert_ne!(first.allocate(), second.allocate());
    }

    #[test]
    fn ids_carry_the_prefix() {
        let mut ids = IdAllocator::new("block");
        assert!(ids.allocate().as_str().starts_with("block-"));
    }
}
