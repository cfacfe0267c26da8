//! Team and membership records.
//!
//! Owned by the surrounding membership layer; the scheduler only reads them
//! to resolve assignees.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's membership in a team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    /// Membership identifier.
    pub id: Uuid,
    /// Member user.
    pub user_id: Uuid,
    /// Team the user belongs to.
    pub team_id: Uuid,
}

impl Membership {
    /// Creates a membership with a random id.
    pub fn new(user_id: Uuid, team_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            team_id,
        }
    }
}

/// A team and its current memberships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Team identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Current memberships, in join order.
    pub memberships: Vec<Membership>,
}

impl Team {
    /// Creates an empty team.
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            memberships: Vec::new(),
        }
    }

    /// Adds a user as a member and returns the team.
    pub fn with_member(mut self, user_id: Uuid) -> Self {
        self.add_member(user_id);
        self
    }

    /// Adds a user as a member. Idempotent per user.
    pub fn add_member(&mut self, user_id: Uuid) -> &Membership {
        let index = match self.memberships.iter().position(|m| m.user_id == user_id) {
            Some(index) => index,
            None => {
                self.memberships.push(Membership::new(user_id, self.id));
                self.memberships.len() - 1
            }
        };
        &self.memberships[index]
    }

    /// Membership of a user in this team.
    pub fn membership_of(&self, user_id: Uuid) -> Option<&Membership> {
        self.memberships.iter().find(|m| m.user_id == user_id)
    }

    /// Number of members.
    pub fn member_count(&self) -> usize {
        self.memberships.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_member_idempotent() {
        let user = Uuid::new_v4();
        let mut team = Team::new(Uuid::new_v4(), "Team A");
        let first = team.add_member(user).id;
        let second = team.add_member(user).id;
        assert_eq!(first, second);
        assert_eq!(team.member_count(), 1);
        assert_eq!(team.membership_of(user).map(|m| m.team_id), Some(team.id));
    }
}
