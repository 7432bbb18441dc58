use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the lifecycle status of a project.
/// Corresponds to the `project_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Work is ongoing.
    Active,
    /// All work is done.
    Completed,
    /// Kept for reference, no longer worked on.
    Archived,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Active
    }
}

/// The access level a user holds on a project.
///
/// Owner and members may read and write the project's tasks; management of
/// the project itself (updates, deletion, membership changes, task
/// deletion) is reserved to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAccess {
    Owner,
    Member,
    None,
}

/// A project with its member set, as stored and as returned by the API.
///
/// `members` holds user ids only; the owner is not implicitly part of the
/// set, the access predicate grants the owner access regardless.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Project {
    /// Unique identifier for the project (UUID v4).
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// The user who created the project. Immutable.
    pub owner_id: i32,
    pub status: ProjectStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Ids of users granted member access, in the order they were added.
    pub members: Vec<i32>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// The single source of truth for project authorization.
    pub fn access_for(&self, user_id: i32) -> ProjectAccess {
        if self.owner_id == user_id {
            ProjectAccess::Owner
        } else if self.members.contains(&user_id) {
            ProjectAccess::Member
        } else {
            ProjectAccess::None
        }
    }

    /// Owner or member: may read the project and read/write its tasks.
    pub fn can_access(&self, user_id: i32) -> bool {
        self.access_for(user_id) != ProjectAccess::None
    }

    /// Owner only: may update/delete the project, change membership and
    /// delete tasks.
    pub fn can_manage(&self, user_id: i32) -> bool {
        self.access_for(user_id) == ProjectAccess::Owner
    }
}

/// Input structure for creating a project.
#[derive(Debug, Deserialize, Validate)]
pub struct ProjectInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Initial member set. Defaults to empty; duplicates are collapsed.
    pub members: Option<Vec<i32>>,
}

/// Merge-patch payload for project updates. Absent and empty-string fields
/// leave the stored value unchanged. A present `members` list fully
/// replaces the member set.
#[derive(Debug, Deserialize, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub members: Option<Vec<i32>>,
}

/// Body of `POST /projects/{id}/members`.
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: i32,
}
