/// Resource authorization
///
/// Every permission decision goes through one table keyed by
/// `(resource kind, action, relation)`. Handlers compute how the caller
/// relates to the entity ([`Relation`]) and ask [`is_permitted`] or
/// [`require`]; nothing else grants access.
///
/// # Policy
///
/// | Resource     | Create        | Read                      | Update                    | Delete                  |
/// |--------------|---------------|---------------------------|---------------------------|-------------------------|
/// | Project      | owner         | owner                     | owner                     | owner                   |
/// | Task         | project owner | project owner OR assignee | project owner OR assignee | project owner           |
/// | Comment      | project owner | project owner             | author                    | author OR project owner |
/// | Team         | creator       | creator OR member         | creator OR member         | creator                 |
/// | Notification | addressee     | addressee                 | addressee                 | addressee               |
///
/// "Owner" for tasks and comments is the owner of the enclosing project.
/// For teams, "owner" is the creator. `Create` is checked against the
/// relation the caller would have to the new entity, so creating a task
/// means owning the project it goes into.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::authorization::{is_permitted, Action, Relation, ResourceKind};
///
/// let assignee = Relation { assignee: true, ..Relation::NONE };
/// assert!(is_permitted(ResourceKind::Task, Action::Update, assignee));
/// assert!(!is_permitted(ResourceKind::Task, Action::Delete, assignee));
/// ```

use std::fmt;

/// What the caller wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Kind of entity being accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Project,
    Task,
    Comment,
    Team,
    Notification,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Project,
        ResourceKind::Task,
        ResourceKind::Comment,
        ResourceKind::Team,
        ResourceKind::Notification,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Project => "project",
            ResourceKind::Task => "task",
            ResourceKind::Comment => "comment",
            ResourceKind::Team => "team",
            ResourceKind::Notification => "notification",
        };
        f.write_str(s)
    }
}

/// How the caller relates to one entity
///
/// Flags are independent; a project owner may also be the assignee of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Relation {
    /// Owns the project (directly, or the project enclosing a task/comment),
    /// or created the team
    pub owner: bool,

    /// Is the task's assignee
    pub assignee: bool,

    /// Belongs to the team
    pub member: bool,

    /// Wrote the comment
    pub author: bool,

    /// Receives the notification
    pub addressee: bool,
}

impl Relation {
    /// No relation at all
    pub const NONE: Relation = Relation {
        owner: false,
        assignee: false,
        member: false,
        author: false,
        addressee: false,
    };

    pub fn owner() -> Self {
        Relation { owner: true, ..Self::NONE }
    }

    pub fn addressee() -> Self {
        Relation { addressee: true, ..Self::NONE }
    }
}

/// Access denied by the policy table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Not allowed to {action} this {kind}")]
pub struct AuthzError {
    pub kind: ResourceKind,
    pub action: Action,
}

/// Looks up the policy table
pub fn is_permitted(kind: ResourceKind, action: Action, rel: Relation) -> bool {
    use Action::*;
    use ResourceKind::*;

    match (kind, action) {
        (Project, _) => rel.owner,

        (Task, Read | Update) => rel.owner || rel.assignee,
        (Task, Create | Delete) => rel.owner,

        (Comment, Create | Read) => rel.owner,
        (Comment, Update) => rel.author,
        (Comment, Delete) => rel.author || rel.owner,

        (Team, Read | Update) => rel.owner || rel.member,
        (Team, Create | Delete) => rel.owner,

        (Notification, _) => rel.addressee,
    }
}

/// [`is_permitted`] as a `Result` for use with `?`
pub fn require(kind: ResourceKind, action: Action, rel: Relation) -> Result<(), AuthzError> {
    if is_permitted(kind, action, rel) {
        Ok(())
    } else {
        Err(AuthzError { kind, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_relations() -> Vec<Relation> {
        (0u8..32)
            .map(|bits| Relation {
                owner: bits & 1 != 0,
                assignee: bits & 2 != 0,
                member: bits & 4 != 0,
                author: bits & 8 != 0,
                addressee: bits & 16 != 0,
            })
            .collect()
    }

    #[test]
    fn test_nobody_gets_anything() {
        for kind in ResourceKind::ALL {
            for action in Action::ALL {
                assert!(
                    !is_permitted(kind, action, Relation::NONE),
                    "{} {} allowed without relation",
                    action,
                    kind
                );
            }
        }
    }

    #[test]
    fn test_project_is_owner_only() {
        for rel in all_relations() {
            for action in Action::ALL {
                assert_eq!(is_permitted(ResourceKind::Project, action, rel), rel.owner);
            }
        }
    }

    #[test]
    fn test_task_rules() {
        let assignee = Relation { assignee: true, ..Relation::NONE };

        assert!(is_permitted(ResourceKind::Task, Action::Read, assignee));
        assert!(is_permitted(ResourceKind::Task, Action::Update, assignee));
        assert!(!is_permitted(ResourceKind::Task, Action::Delete, assignee));
        assert!(!is_permitted(ResourceKind::Task, Action::Create, assignee));

        for action in Action::ALL {
            assert!(is_permitted(ResourceKind::Task, action, Relation::owner()));
        }
    }

    #[test]
    fn test_comment_rules() {
        let author = Relation { author: true, ..Relation::NONE };

        assert!(!is_permitted(ResourceKind::Comment, Action::Read, author));
        assert!(is_permitted(ResourceKind::Comment, Action::Update, author));
        assert!(is_permitted(ResourceKind::Comment, Action::Delete, author));

        // Writing the comment does not make up for not owning the project
        assert!(!is_permitted(ResourceKind::Comment, Action::Create, author));

        let owner = Relation::owner();
        assert!(is_permitted(ResourceKind::Comment, Action::Create, owner));
        assert!(is_permitted(ResourceKind::Comment, Action::Read, owner));
        assert!(!is_permitted(ResourceKind::Comment, Action::Update, owner));
        assert!(is_permitted(ResourceKind::Comment, Action::Delete, owner));
    }

    #[test]
    fn test_team_rules() {
        let member = Relation { member: true, ..Relation::NONE };

        assert!(is_permitted(ResourceKind::Team, Action::Read, member));
        assert!(is_permitted(ResourceKind::Team, Action::Update, member));
        assert!(!is_permitted(ResourceKind::Team, Action::Delete, member));
        assert!(!is_permitted(ResourceKind::Team, Action::Create, member));
        assert!(is_permitted(ResourceKind::Team, Action::Delete, Relation::owner()));
    }

    #[test]
    fn test_notification_is_addressee_only() {
        for rel in all_relations() {
            for action in Action::ALL {
                assert_eq!(
                    is_permitted(ResourceKind::Notification, action, rel),
                    rel.addressee
                );
            }
        }
    }

    #[test]
    fn test_irrelevant_flags_grant_nothing() {
        // Flags that do not apply to a kind never widen access
        let foreign = Relation {
            member: true,
            addressee: true,
            author: true,
            ..Relation::NONE
        };
        assert!(!is_permitted(ResourceKind::Project, Action::Read, foreign));
        assert!(!is_permitted(ResourceKind::Task, Action::Read, foreign));
    }

    #[test]
    fn test_create_follows_parent_ownership() {
        let assignee_and_author = Relation {
            assignee: true,
            author: true,
            ..Relation::NONE
        };

        for kind in [ResourceKind::Task, ResourceKind::Comment] {
            assert!(is_permitted(kind, Action::Create, Relation::owner()));
            assert!(!is_permitted(kind, Action::Create, assignee_and_author));
        }

        let err = require(ResourceKind::Comment, Action::Create, assignee_and_author).unwrap_err();
        assert_eq!(err.to_string(), "Not allowed to create this comment");
    }

    #[test]
    fn test_require_reports_denial() {
        let err = require(ResourceKind::Task, Action::Delete, Relation::NONE).unwrap_err();
        assert_eq!(err.kind, ResourceKind::Task);
        assert_eq!(err.action, Action::Delete);
        assert_eq!(err.to_string(), "Not allowed to delete this task");

        assert!(require(ResourceKind::Task, Action::Delete, Relation::owner()).is_ok());
    }
}
