//! Authorization for cascading deletes.
//!
//! The caller is passed explicitly into every repository call instead of being
//! read from request-global state.

use crate::activities::Activity;

/// Identity of whoever triggered the current operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Caller {
    /// Zero for guests.
    pub user_id: i32,
    pub is_moderator: bool,
}

impl Caller {
    pub fn user(user_id: i32) -> Self {
        Self {
            user_id,
            is_moderator: false,
        }
    }

    pub fn moderator(user_id: i32) -> Self {
        Self {
            user_id,
            is_moderator: true,
        }
    }

    pub fn guest() -> Self {
        Self::default()
    }

    pub fn is_guest(&self) -> bool {
        self.user_id == 0
    }
}

/// Decides whether a caller may delete an activity entry.
pub trait DeleteAuthorizer: Send + Sync {
    fn can_delete(&self, activity: &Activity, caller: &Caller) -> bool;
}

/// Authors may delete their own activity; moderators may delete any.
#[derive(Clone, Copy, Debug, Default)]
pub struct OwnerOrModerator;

impl DeleteAuthorizer for OwnerOrModerator {
    fn can_delete(&self, activity: &Activity, caller: &Caller) -> bool {
        if caller.is_guest() {
            return false;
        }
        caller.is_moderator || caller.user_id == activity.user_id
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn activity(user_id: i32) -> Activity {
        Activity {
            id: 10,
            user_id,
            component: "activity".to_string(),
            activity_type: "activity_update".to_string(),
            item_id: 0,
            secondary_item_id: 0,
            content: String::new(),
            date_recorded: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_owner_can_delete() {
        assert!(OwnerOrModerator.can_delete(&activity(7), &Caller::user(7)));
    }

    #[test]
    fn test_other_user_cannot_delete() {
        assert!(!OwnerOrModerator.can_delete(&activity(7), &Caller::user(8)));
    }

    #[test]
    fn test_moderator_can_delete() {
        assert!(OwnerOrModerator.can_delete(&activity(7), &Caller::moderator(2)));
    }

    #[test]
    fn test_guest_cannot_delete() {
        assert!(!OwnerOrModerator.can_delete(&activity(0), &Caller::guest()));
    }
}
