pub mod account;
pub mod auth;
pub mod task;
pub mod team;
pub mod time_entry;

pub use account::{Account, AccountId, AccountSummary, NewAccount, Registration, UniqueField};
pub use auth::{Identity, PurposeClaims, SessionToken, TokenAction};
pub use task::{
    ListMeta, NewTask, Task, TaskChanges, TaskId, TaskList, TaskStatus, TaskWithEntries,
};
pub use team::{TeamId, TeamMembership, TeamRole};
pub use time_entry::{NewTimeEntry, TimeEntry, TimeEntryChanges, TimeEntryId};
