//! Privilege checks.
//!
//! Deciding who is an admin belongs to the chat framework. The store only asks,
//! and only before overwriting an existing term or forgetting one.

use std::collections::HashSet;

use crate::intent::Requester;
use crate::term::AuthorId;

/// Answers whether a requester may overwrite or forget terms.
pub trait Authorizer: Send + Sync {
    /// True if `requester` is privileged.
    fn is_admin(&self, requester: &Requester) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&Requester) -> bool + Send + Sync,
{
    fn is_admin(&self, requester: &Requester) -> bool {
        self(requester)
    }
}

/// A fixed admin group.
#[derive(Debug, Clone, Default)]
pub struct StaticAdmins {
    admins: HashSet<AuthorId>,
}

impl StaticAdmins {
    /// Build from a list of user ids.
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(AuthorId::new).collect(),
        }
    }

    /// Add a user to the group.
    pub fn insert(&mut self, user: AuthorId) {
        self.admins.insert(user);
    }

    /// Number of admins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.admins.len()
    }

    /// True if nobody is an admin.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

impl Authorizer for StaticAdmins {
    fn is_admin(&self, requester: &Requester) -> bool {
        self.admins.contains(&requester.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_admins_match_by_user_id() {
        let admins = StaticAdmins::new(["alice"]);
        assert!(admins.is_admin(&Requester::new("alice").display_name("Alice")));
        assert!(!admins.is_admin(&Requester::new("bob")));
        assert!(!StaticAdmins::default().is_admin(&Requester::new("alice")));
    }

    #[test]
    fn closures_are_authorizers() {
        let only_private = |r: &Requester| r.private_channel;
        assert!(only_private.is_admin(&Requester::new("x").in_private()));
        assert!(!only_private.is_admin(&Requester::new("x")));
    }
}
