//! # Access Policy
//!
//! Decides whether a caller may read another staff member's statistics.
//!
//! ```text
//! caller role │ own stats │ someone else's
//! ────────────┼───────────┼───────────────
//! admin       │    ✓      │      ✓
//! waiter      │    ✓      │      ✗
//! cashier     │    ✓      │      ✗
//! ```
//!
//! The statistics engine only sees the [`AccessPolicy`] trait, so tests can
//! inject any predicate (closures implement it).

use crate::types::{Caller, StaffRole};

/// Predicate `(caller_id, caller_role, target_staff_id) -> allowed`.
pub trait AccessPolicy: Send + Sync {
    fn allows(&self, caller_id: &str, caller_role: StaffRole, target_staff_id: &str) -> bool;

    /// Convenience wrapper taking a resolved [`Caller`].
    fn allows_caller(&self, caller: &Caller, target_staff_id: &str) -> bool {
        self.allows(&caller.staff_id, caller.role, target_staff_id)
    }
}

/// Staff may read their own statistics; admins may read anyone's.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfOrAdmin;

impl AccessPolicy for SelfOrAdmin {
    fn allows(&self, caller_id: &str, caller_role: StaffRole, target_staff_id: &str) -> bool {
        caller_role == StaffRole::Admin || caller_id == target_staff_id
    }
}

impl<F> AccessPolicy for F
where
    F: Fn(&str, StaffRole, &str) -> bool + Send + Sync,
{
    fn allows(&self, caller_id: &str, caller_role: StaffRole, target_staff_id: &str) -> bool {
        self(caller_id, caller_role, target_staff_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_or_admin() {
        let policy = SelfOrAdmin;
        assert!(policy.allows("w-1", StaffRole::Waiter, "w-1"));
        assert!(!policy.allows("w-1", StaffRole::Waiter, "w-2"));
        assert!(!policy.allows("c-1", StaffRole::Cashier, "w-2"));
        assert!(policy.allows("a-1", StaffRole::Admin, "w-2"));
    }

    #[test]
    fn test_closure_policy() {
        let deny_all = |_: &str, _: StaffRole, _: &str| false;
        let caller = Caller::new("a-1", StaffRole::Admin);
        assert!(!deny_all.allows_caller(&caller, "a-1"));
        assert!(SelfOrAdmin.allows_caller(&caller, "anyone"));
    }
}
