use std::collections::HashSet;
use tether_core::UserId;

/// Named broadcast group, optionally gated by a password.
#[derive(Debug, Clone)]
pub struct Room {
    pub name: String,
    /// Empty means open. Set by the first joiner.
    pub(crate) password: String,
    pub members: HashSet<UserId>,
}

impl Room {
    pub(crate) fn new(name: &str, password: &str) -> Self {
        Self {
            name: name.to_owned(),
            password: password.to_owned(),
            members: HashSet::new(),
        }
    }

    pub fn is_protected(&self) -> bool {
        !self.password.is_empty()
    }

    /// Whether `password` grants access to an existing room.
    pub fn admits(&self, password: &str) -> bool {
        self.password == password
    }
}
