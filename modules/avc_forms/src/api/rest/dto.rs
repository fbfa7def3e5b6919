use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::contract::model::{
    NewPatient, NewUser, Page, PageRequest, Patient, PatientPatch, User, UserPatch,
};

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn default_true() -> bool {
    true
}

// --- users ---

/// REST DTO for user representation. The password hash is never exposed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
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
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Full update (`PUT`). Omitted optional fields keep their value.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReplaceUserReq {
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

/// Partial update (`PATCH`).
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
pub struct UpdateUserReq {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListDto {
    /// Total number of users.
    pub count: u64,
    pub limit: u64,
    pub offset: u64,
    pub results: Vec<UserDto>,
}

// --- patients ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientDto {
    pub id: Uuid,
    pub code: String,
    #[schema(value_type = Object)]
    pub form_data: Value,
    pub owner: Option<Uuid>,
    pub created_by: Uuid,
    pub last_updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit fields (`created_by`, `last_updated_by`) are not part of any request
/// body; if a client sends them they are ignored.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    pub code: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub form_data: Option<Value>,
    #[serde(default)]
    pub owner: Option<Uuid>,
}

/// Full update (`PUT`).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReplacePatientReq {
    pub code: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub form_data: Option<Value>,
    /// `null` clears the owner; omitting the field keeps it.
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub owner: Option<Option<Uuid>>,
}

/// Partial update (`PATCH`).
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
pub struct UpdatePatientReq {
    pub code: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub form_data: Option<Value>,
    /// `null` clears the owner; omitting the field keeps it.
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub owner: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientListDto {
    /// Total number of patients visible to the requester.
    pub count: u64,
    pub limit: u64,
    pub offset: u64,
    pub results: Vec<PatientDto>,
}

/// Pagination query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Page size; capped by the server.
    pub limit: Option<u64>,
    /// Number of rows to skip.
    pub offset: Option<u64>,
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            date_joined: user.date_joined,
            last_login: user.last_login,
            permissions: user.permissions,
        }
    }
}

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        Self {
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password: req.password,
            is_active: req.is_active,
            is_staff: false,
            is_superuser: false,
        }
    }
}

impl From<ReplaceUserReq> for UserPatch {
    fn from(req: ReplaceUserReq) -> Self {
        Self {
            username: Some(req.username),
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            is_active: req.is_active,
            password: req.password,
        }
    }
}

impl From<UpdateUserReq> for UserPatch {
    fn from(req: UpdateUserReq) -> Self {
        Self {
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            is_active: req.is_active,
            password: req.password,
        }
    }
}

impl From<Page<User>> for UserListDto {
    fn from(page: Page<User>) -> Self {
        let page = page.map(UserDto::from);
        Self {
            count: page.total,
            limit: page.limit,
            offset: page.offset,
            results: page.items,
        }
    }
}

impl From<Patient> for PatientDto {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            code: p.code,
            form_data: p.form_data,
            owner: p.owner,
            created_by: p.created_by,
            last_updated_by: p.last_updated_by,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<CreatePatientReq> for NewPatient {
    fn from(req: CreatePatientReq) -> Self {
        Self {
            code: req.code,
            form_data: req.form_data,
            owner: req.owner,
        }
    }
}

impl From<ReplacePatientReq> for PatientPatch {
    fn from(req: ReplacePatientReq) -> Self {
        Self {
            code: Some(req.code),
            form_data: req.form_data,
            owner: req.owner,
        }
    }
}

impl From<UpdatePatientReq> for PatientPatch {
    fn from(req: UpdatePatientReq) -> Self {
        Self {
            code: req.code,
            form_data: req.form_data,
            owner: req.owner,
        }
    }
}

impl From<Page<Patient>> for PatientListDto {
    fn from(page: Page<Patient>) -> Self {
        let page = page.map(PatientDto::from);
        Self {
            count: page.total,
            limit: page.limit,
            offset: page.offset,
            results: page.items,
        }
    }
}

impl From<ListQuery> for PageRequest {
    fn from(q: ListQuery) -> Self {
        Self {
            limit: q.limit,
            offset: q.offset,
        }
    }
}
