use crate::contract::model::{Patient, User};
use crate::infra::storage::entity::{patient, user};

/// Build the contract user from its row plus granted codenames.
pub fn user_from_row(row: user::Model, mut permissions: Vec<String>) -> User {
    permissions.sort();
    permissions.dedup();
    User {
        id: row.id,
        username: row.username,
        email: row.email,
        first_name: row.first_name,
        last_name: row.last_name,
        is_active: row.is_active,
        is_staff: row.is_staff,
        is_superuser: row.is_superuser,
        date_joined: row.date_joined,
        last_login: row.last_login,
        permissions,
    }
}

impl From<patient::Model> for Patient {
    fn from(row: patient::Model) -> Self {
        Self {
            id: row.id,
            code: row.code,
            form_data: row.form_data,
            owner: row.owner_id,
            created_by: row.created_by,
            last_updated_by: row.last_updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
