//! Assignee resolution.
//!
//! Expands a heterogeneous identifier list into concrete (user, membership)
//! pairs. Each identifier may be:
//! - the project's team id: expands to every current membership,
//! - a membership id: accepted if the membership belongs to the project team,
//! - a user id: resolved through that user's membership in the project team.
//!
//! Resolution is all-or-nothing: the first identifier that fails aborts the
//! whole list, so no assignee records are written for a bad request.

use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{Result, ScheduleError};
use crate::models::{Membership, TaskAssignee, Team};

/// Read access to team memberships, provided by the membership layer.
pub trait MembershipDirectory {
    /// Current memberships of a team, in a stable order.
    fn team_memberships(&self, team_id: Uuid) -> Vec<Membership>;

    /// Membership by its own id, whatever team it belongs to.
    fn membership(&self, membership_id: Uuid) -> Option<Membership>;

    /// A user's membership in a specific team.
    fn membership_for_user(&self, team_id: Uuid, user_id: Uuid) -> Option<Membership> {
        self.team_memberships(team_id)
            .into_iter()
            .find(|m| m.user_id == user_id)
    }
}

impl MembershipDirectory for Team {
    fn team_memberships(&self, team_id: Uuid) -> Vec<Membership> {
        if team_id == self.id {
            self.memberships.clone()
        } else {
            Vec::new()
        }
    }

    fn membership(&self, membership_id: Uuid) -> Option<Membership> {
        self.memberships
            .iter()
            .find(|m| m.id == membership_id)
            .cloned()
    }
}

impl MembershipDirectory for [Team] {
    fn team_memberships(&self, team_id: Uuid) -> Vec<Membership> {
        self.iter()
            .find(|t| t.id == team_id)
            .map(|t| t.memberships.clone())
            .unwrap_or_default()
    }

    fn membership(&self, membership_id: Uuid) -> Option<Membership> {
        self.iter().find_map(|t| t.membership(membership_id))
    }
}

/// A resolved assignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedAssignee {
    /// Assigned user.
    pub user_id: Uuid,
    /// Membership the user was resolved through.
    pub membership_id: Uuid,
}

impl From<&Membership> for ResolvedAssignee {
    fn from(m: &Membership) -> Self {
        Self {
            user_id: m.user_id,
            membership_id: m.id,
        }
    }
}

/// Resolves identifiers against the project team.
///
/// Duplicate users collapse to their first occurrence. An empty list is
/// always valid, even for a project without a team.
pub fn resolve_assignees<D: MembershipDirectory + ?Sized>(
    identifiers: &[Uuid],
    team_id: Option<Uuid>,
    directory: &D,
) -> Result<Vec<ResolvedAssignee>> {
    if identifiers.is_empty() {
        return Ok(Vec::new());
    }
    let team_id = team_id.ok_or_else(|| {
        ScheduleError::unresolved_assignee(identifiers[0], "project has no team")
    })?;

    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    let mut push = |m: &Membership, out: &mut Vec<ResolvedAssignee>| {
        if seen.insert(m.user_id) {
            out.push(ResolvedAssignee::from(m));
        }
    };

    for &identifier in identifiers {
        if identifier == team_id {
            for m in &directory.team_memberships(team_id) {
                push(m, &mut resolved);
            }
        } else if let Some(m) = directory.membership(identifier) {
            if m.team_id != team_id {
                return Err(ScheduleError::unresolved_assignee(
                    identifier,
                    "membership belongs to another team",
                ));
            }
            push(&m, &mut resolved);
        } else if let Some(m) = directory.membership_for_user(team_id, identifier) {
            push(&m, &mut resolved);
        } else {
            return Err(ScheduleError::unresolved_assignee(
                identifier,
                "not a member of the project team",
            ));
        }
    }

    Ok(resolved)
}

/// Builds the new assignee list for a task.
///
/// Users already assigned keep their record (and completion flag); new
/// users get fresh records; users not in `resolved` are dropped.
pub fn replace_assignees(
    existing: &[TaskAssignee],
    resolved: &[ResolvedAssignee],
) -> Vec<TaskAssignee> {
    resolved
        .iter()
        .map(|r| {
            existing
                .iter()
                .find(|a| a.user_id == r.user_id)
                .cloned()
                .unwrap_or_else(|| TaskAssignee::new(r.user_id).with_membership(r.membership_id))
        })
        .collect()
}
