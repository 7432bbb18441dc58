pub mod project;
pub mod task;
pub mod user;

pub use project::{AddMemberRequest, Project, ProjectAccess, ProjectInput, ProjectPatch, ProjectStatus};
pub use task::{Comment, CommentInput, Task, TaskInput, TaskPatch, TaskPriority, TaskStatus};
pub use user::{User, UserPatch, UserRole};
