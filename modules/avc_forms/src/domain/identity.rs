use std::collections::BTreeSet;
use uuid::Uuid;

use crate::contract::model::User;

/// Authenticated requester as seen by the domain services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: Uuid,
    username: String,
    is_superuser: bool,
    permissions: BTreeSet<String>,
}

impl Identity {
    pub fn new(
        user_id: Uuid,
        username: impl Into<String>,
        is_superuser: bool,
        permissions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_superuser,
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self::new(
            user.id,
            user.username.clone(),
            user.is_superuser,
            user.permissions.iter().cloned(),
        )
    }

    #[inline]
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    #[inline]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[inline]
    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    /// Superusers implicitly hold every permission.
    pub fn has_perm(&self, codename: &str) -> bool {
        self.is_superuser || self.permissions.contains(codename)
    }

    // audit helpers
    #[inline]
    pub fn created_by(&self) -> Uuid {
        self.user_id
    }

    #[inline]
    pub fn updated_by(&self) -> Uuid {
        self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superuser_has_every_permission() {
        let root = Identity::new(Uuid::new_v4(), "root", true, []);
        assert!(root.has_perm("add_patient"));
        assert!(root.has_perm("anything_else"));
    }

    #[test]
    fn regular_identity_only_has_granted_permissions() {
        let id = Uuid::new_v4();
        let nurse = Identity::new(id, "nurse", false, ["change_patient".to_string()]);
        assert!(nurse.has_perm("change_patient"));
        assert!(!nurse.has_perm("delete_patient"));
        assert_eq!(nurse.created_by(), id);
        assert_eq!(nurse.updated_by(), id);
    }
}
