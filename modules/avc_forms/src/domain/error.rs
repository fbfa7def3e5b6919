use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Patient not found: {id}")]
    PatientNotFound { id: Uuid },

    #[error("User not found: {id}")]
    UserNotFound { id: Uuid },

    #[error("User with username '{username}' already exists")]
    UsernameAlreadyExists { username: String },

    #[error("User {id} is still recorded as creator or last updater of patients")]
    UserInUse { id: Uuid },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Authentication failed: {reason}")]
    Unauthenticated { reason: String },

    #[error("Permission '{permission}' required")]
    PermissionDenied { permission: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Credential error: {message}")]
    Credentials { message: String },
}

impl DomainError {
    pub fn patient_not_found(id: Uuid) -> Self {
        Self::PatientNotFound { id }
    }

    pub fn user_not_found(id: Uuid) -> Self {
        Self::UserNotFound { id }
    }

    pub fn username_already_exists(username: impl Into<String>) -> Self {
        Self::UsernameAlreadyExists {
            username: username.into(),
        }
    }

    pub fn user_in_use(id: Uuid) -> Self {
        Self::UserInUse { id }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
        }
    }

    pub fn permission_denied(permission: impl Into<String>) -> Self {
        Self::PermissionDenied {
            permission: permission.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for DomainError {
    fn from(e: anyhow::Error) -> Self {
        // repositories wrap constraint violations they can name
        match e.downcast::<DomainError>() {
            Ok(domain) => domain,
            // {:#} keeps the repository context chain in the message
            Err(e) => Self::database(format!("{e:#}")),
        }
    }
}
