//! Patient visibility and model-permission rules.

use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::identity::Identity;

/// Model permissions gating patient writes. Reads need authentication only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatientPermission {
    Add,
    Change,
    Delete,
}

impl PatientPermission {
    pub const ALL: [PatientPermission; 3] = [Self::Add, Self::Change, Self::Delete];

    pub fn codename(self) -> &'static str {
        match self {
            Self::Add => "add_patient",
            Self::Change => "change_patient",
            Self::Delete => "delete_patient",
        }
    }

    pub fn from_codename(codename: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.codename() == codename)
    }
}

/// Rows of `patients` an identity may see and therefore act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientScope {
    All,
    CreatedBy(Uuid),
}

impl PatientScope {
    pub fn for_identity(ctx: &Identity) -> Self {
        if ctx.is_superuser() {
            Self::All
        } else {
            Self::CreatedBy(ctx.user_id())
        }
    }
}

pub fn require(ctx: &Identity, perm: PatientPermission) -> Result<(), DomainError> {
    if ctx.has_perm(perm.codename()) {
        Ok(())
    } else {
        Err(DomainError::permission_denied(perm.codename()))
    }
}
