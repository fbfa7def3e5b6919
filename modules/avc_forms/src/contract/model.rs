use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Identity record (no serde; REST DTOs own the wire shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    /// Granted permission codenames, sorted.
    pub permissions: Vec<String>,
}

/// Data for creating a user. `password` is plain text and is hashed by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewUser {
    /// Active, unprivileged account with empty profile fields.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            password: password.into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }
}

/// Partial update for a user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub code: String,
    /// Form answers, always a JSON object.
    pub form_data: Value,
    /// Assigned responsible identity; cleared when that user is deleted.
    pub owner: Option<Uuid>,
    pub created_by: Uuid,
    pub last_updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable fields of a new patient. Audit fields are never caller-supplied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewPatient {
    pub code: String,
    pub form_data: Option<Value>,
    pub owner: Option<Uuid>,
}

/// Partial update for a patient. `owner: Some(None)` clears the owner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatientPatch {
    pub code: Option<String>,
    pub form_data: Option<Value>,
    pub owner: Option<Option<Uuid>>,
}

/// Limit/offset window requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// One window of a listing with the total number of matching rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
