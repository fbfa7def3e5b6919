use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{Page, Patient, User};
use crate::domain::policy::PatientScope;

/// Persistence operations the user service needs.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// User plus stored password hash, looked up by username.
    async fn find_credentials(&self, username: &str) -> anyhow::Result<Option<(User, String)>>;
    /// True if another user (not `except`) already has this username.
    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> anyhow::Result<bool>;
    async fn insert(&self, u: &User, password_hash: &str) -> anyhow::Result<()>;
    /// Update profile fields of `u.id`; the password hash is left alone.
    async fn update(&self, u: &User) -> anyhow::Result<()>;
    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;
    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<()>;
    /// Delete by id. Returns true if a row was deleted.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Newest `date_joined` first.
    async fn list_page(&self, limit: u64, offset: u64) -> anyhow::Result<Page<User>>;
    /// Idempotent.
    async fn grant_permission(&self, id: Uuid, codename: &str) -> anyhow::Result<()>;
}

/// Persistence operations the patient service needs. Every lookup is
/// restricted by a [`PatientScope`].
#[async_trait]
pub trait PatientsRepository: Send + Sync {
    async fn find(&self, scope: PatientScope, id: Uuid) -> anyhow::Result<Option<Patient>>;
    async fn list_page(
        &self,
        scope: PatientScope,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Page<Patient>>;
    async fn insert(&self, p: &Patient) -> anyhow::Result<()>;
    /// Persist mutable fields; `created_by` and `created_at` are never written.
    async fn update(&self, p: &Patient) -> anyhow::Result<()>;
    async fn delete(&self, scope: PatientScope, id: Uuid) -> anyhow::Result<bool>;
    /// Patients whose `created_by` or `last_updated_by` is `user_id`.
    async fn count_authored_by(&self, user_id: Uuid) -> anyhow::Result<u64>;
}
