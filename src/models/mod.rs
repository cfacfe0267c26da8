//! Scheduling domain models.
//!
//! Value types the engine reads and writes. The scheduler never owns them
//! beyond one call; the caller loads them from storage and persists the
//! results.
//!
//! | Type | Role |
//! |------|------|
//! | `Task` | Unit of work with a planned window |
//! | `Dependency` | FS/SS/FF/SF precedence edge with lag |
//! | `Window` | `[start, end]` interval and its arithmetic |
//! | `ProjectSnapshot` | All tasks and edges of one project |
//! | `Team` | Memberships used for assignee resolution |

mod dependency;
mod project;
mod task;
mod team;
pub mod window;

pub use dependency::{Dependency, DependencyType, Endpoint};
pub use project::ProjectSnapshot;
pub use task::{CompletionRule, Task, TaskAssignee, TaskStatus};
pub use team::{Membership, Team};
pub use window::Window;
