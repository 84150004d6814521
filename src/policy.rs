//! Visibility and assignment policy for duty.
//!
//! Pure decision functions over the member directory and task documents; no
//! I/O anywhere in this module. The store is the enforcement point — these
//! functions only answer questions.
//!
//! Rank model: level 0 is the top of the hierarchy, larger levels are more
//! junior. Levels 0-1 form the presidium, 2 the executive, 3 directs a
//! domain, 4 leads a vertical inside a domain, 5 and below are members.

use crate::directory::User;
use crate::task::Task;

/// Highest level that still counts as presidium
pub const PRESIDIUM_MAX_LEVEL: u8 = 1;
/// Executive rank
pub const EXECUTIVE_LEVEL: u8 = 2;
/// Domain director rank
pub const DIRECTOR_LEVEL: u8 = 3;
/// Vertical lead rank
pub const LEAD_LEVEL: u8 = 4;

/// Mutations the policy distinguishes between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    /// Title, description, assignees, deadline — the assigner's fields
    EditDetails,
    /// Permanent removal
    Delete,
    /// Progress (and with it the derived status)
    UpdateProgress,
    /// Appending a feed entry
    Comment,
}

/// May `actor` put work on `target`'s plate?
///
/// The actor is never assignable to themselves, whatever their rank.
pub fn is_assignable(actor: &User, target: &User) -> bool {
    if actor.id == target.id {
        return false;
    }

    match actor.level {
        0..=PRESIDIUM_MAX_LEVEL => true,
        EXECUTIVE_LEVEL => target.level >= DIRECTOR_LEVEL,
        DIRECTOR_LEVEL => target.domain == actor.domain && target.level > actor.level,
        LEAD_LEVEL => {
            target.domain == actor.domain
                && actor.subdomain.is_some()
                && target.subdomain == actor.subdomain
                && target.level > actor.level
        }
        _ => false,
    }
}

/// Everyone `actor` may assign tasks to, in directory order
pub fn assignable_targets<'a>(actor: &User, all_users: &'a [User]) -> Vec<&'a User> {
    all_users
        .iter()
        .filter(|target| is_assignable(actor, target))
        .collect()
}

/// May `actor` see `task` in listings and detail views?
pub fn can_view(actor: &User, task: &Task) -> bool {
    if actor.level <= PRESIDIUM_MAX_LEVEL {
        return true;
    }
    task.is_assigner(&actor.id) || task.is_assignee(&actor.id)
}

/// Filter `tasks` down to what `actor` may see, preserving input order.
///
/// Callers wanting the default presentation order should follow up with
/// `task::sort_tasks(.., TaskSort::Created)`; re-sorting never changes the
/// visibility set.
pub fn visible_tasks(actor: &User, mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.retain(|task| can_view(actor, task));
    tasks
}

/// May `actor` perform `action` on `task`?
///
/// Visibility and mutation are independent axes: presidium members see every
/// task but hold no implicit comment or edit rights on tasks they neither
/// assigned nor carry.
pub fn can_mutate(actor: &User, task: &Task, action: TaskAction) -> bool {
    match action {
        TaskAction::EditDetails | TaskAction::Delete => task.is_assigner(&actor.id),
        TaskAction::UpdateProgress => task.is_assignee(&actor.id),
        TaskAction::Comment => task.is_assigner(&actor.id) || task.is_assignee(&actor.id),
    }
}
