//! SeaORM-backed implementations of the domain repository ports.
//!
//! Both repositories are generic over `C: ConnectionTrait`, so they work with
//! a `DatabaseConnection` or a transaction handle.

use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

use crate::contract::model::{Page, Patient, User};
use crate::domain::error::DomainError;
use crate::domain::policy::PatientScope;
use crate::domain::repo::{PatientsRepository, UsersRepository};
use crate::infra::storage::entity::{patient, user, user_permission};
use crate::infra::storage::mapper::user_from_row;

/// Lost races against the unique username index.
fn username_conflict(err: DbErr, username: &str, op: &'static str) -> anyhow::Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            DomainError::username_already_exists(username).into()
        }
        _ => anyhow::Error::new(err).context(op),
    }
}

pub struct SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    async fn permissions_of(&self, ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, Vec<String>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = user_permission::Entity::find()
            .filter(user_permission::Column::UserId.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("load permissions failed")?;

        let mut by_user: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in rows {
            by_user.entry(row.user_id).or_default().push(row.codename);
        }
        Ok(by_user)
    }

    async fn hydrate(&self, row: user::Model) -> anyhow::Result<User> {
        let mut perms = self.permissions_of(&[row.id]).await?;
        let codenames = perms.remove(&row.id).unwrap_or_default();
        Ok(user_from_row(row, codenames))
    }
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let found = user::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_by_id failed")?;
        match found {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_credentials(&self, username: &str) -> anyhow::Result<Option<(User, String)>> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("find_credentials failed")?;
        match found {
            Some(row) => {
                let hash = row.password_hash.clone();
                Ok(Some((self.hydrate(row).await?, hash)))
            }
            None => Ok(None),
        }
    }

    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> anyhow::Result<bool> {
        let mut query = user::Entity::find().filter(user::Column::Username.eq(username));
        if let Some(id) = except {
            query = query.filter(user::Column::Id.ne(id));
        }
        let count = query
            .count(&self.conn)
            .await
            .context("username_taken failed")?;
        Ok(count > 0)
    }

    async fn insert(&self, u: &User, password_hash: &str) -> anyhow::Result<()> {
        let m = user::ActiveModel {
            id: Set(u.id),
            username: Set(u.username.clone()),
            email: Set(u.email.clone()),
            first_name: Set(u.first_name.clone()),
            last_name: Set(u.last_name.clone()),
            is_active: Set(u.is_active),
            is_staff: Set(u.is_staff),
            is_superuser: Set(u.is_superuser),
            date_joined: Set(u.date_joined),
            last_login: Set(u.last_login),
            password_hash: Set(password_hash.to_string()),
        };
        let _ = m
            .insert(&self.conn)
            .await
            .map_err(|e| username_conflict(e, &u.username, "insert user failed"))?;
        Ok(())
    }

    async fn update(&self, u: &User) -> anyhow::Result<()> {
        let m = user::ActiveModel {
            id: Set(u.id),
            username: Set(u.username.clone()),
            email: Set(u.email.clone()),
            first_name: Set(u.first_name.clone()),
            last_name: Set(u.last_name.clone()),
            is_active: Set(u.is_active),
            is_staff: Set(u.is_staff),
            is_superuser: Set(u.is_superuser),
            date_joined: NotSet,
            last_login: NotSet,
            password_hash: NotSet,
        };
        let _ = m
            .update(&self.conn)
            .await
            .map_err(|e| username_conflict(e, &u.username, "update user failed"))?;
        Ok(())
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        let m = user::ActiveModel {
            id: Set(id),
            password_hash: Set(password_hash.to_string()),
            ..Default::default()
        };
        let _ = m.update(&self.conn).await.context("set_password failed")?;
        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<()> {
        let m = user::ActiveModel {
            id: Set(id),
            last_login: Set(Some(at)),
            ..Default::default()
        };
        let _ = m
            .update(&self.conn)
            .await
            .context("touch_last_login failed")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = user::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .map_err(|e| match e.sql_err() {
                // patients still reference the user as an author
                Some(SqlErr::ForeignKeyConstraintViolation(_)) => DomainError::user_in_use(id).into(),
                _ => anyhow::Error::new(e).context("delete user failed"),
            })?;
        Ok(res.rows_affected > 0)
    }

    async fn list_page(&self, limit: u64, offset: u64) -> anyhow::Result<Page<User>> {
        let total = user::Entity::find()
            .count(&self.conn)
            .await
            .context("count users failed")?;

        let rows = user::Entity::find()
            .order_by_desc(user::Column::DateJoined)
            .order_by_asc(user::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await
            .context("list users failed")?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut perms = self.permissions_of(&ids).await?;
        let items = rows
            .into_iter()
            .map(|row| {
                let codenames = perms.remove(&row.id).unwrap_or_default();
                user_from_row(row, codenames)
            })
            .collect();

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    async fn grant_permission(&self, id: Uuid, codename: &str) -> anyhow::Result<()> {
        let existing = user_permission::Entity::find_by_id((id, codename.to_string()))
            .one(&self.conn)
            .await
            .context("grant_permission lookup failed")?;
        if existing.is_some() {
            return Ok(());
        }

        let m = user_permission::ActiveModel {
            user_id: Set(id),
            codename: Set(codename.to_string()),
        };
        let _ = m
            .insert(&self.conn)
            .await
            .context("grant_permission failed")?;
        Ok(())
    }
}

pub struct SeaOrmPatientsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmPatientsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

fn scope_condition(scope: PatientScope) -> Condition {
    match scope {
        PatientScope::All => Condition::all(),
        PatientScope::CreatedBy(user_id) => {
            Condition::all().add(patient::Column::CreatedBy.eq(user_id))
        }
    }
}

#[async_trait::async_trait]
impl<C> PatientsRepository for SeaOrmPatientsRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find(&self, scope: PatientScope, id: Uuid) -> anyhow::Result<Option<Patient>> {
        let found = patient::Entity::find_by_id(id)
            .filter(scope_condition(scope))
            .one(&self.conn)
            .await
            .context("find patient failed")?;
        Ok(found.map(Into::into))
    }

    async fn list_page(
        &self,
        scope: PatientScope,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Page<Patient>> {
        let total = patient::Entity::find()
            .filter(scope_condition(scope))
            .count(&self.conn)
            .await
            .context("count patients failed")?;

        let rows = patient::Entity::find()
            .filter(scope_condition(scope))
            .order_by_asc(patient::Column::CreatedAt)
            .order_by_asc(patient::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await
            .context("list patients failed")?;

        Ok(Page {
            items: rows.into_iter().map(Into::into).collect(),
            total,
            limit,
            offset,
        })
    }

    async fn insert(&self, p: &Patient) -> anyhow::Result<()> {
        let m = patient::ActiveModel {
            id: Set(p.id),
            code: Set(p.code.clone()),
            form_data: Set(p.form_data.clone()),
            owner_id: Set(p.owner),
            created_by: Set(p.created_by),
            last_updated_by: Set(p.last_updated_by),
            created_at: Set(p.created_at),
            updated_at: Set(p.updated_at),
        };
        let _ = m.insert(&self.conn).await.context("insert patient failed")?;
        Ok(())
    }

    async fn update(&self, p: &Patient) -> anyhow::Result<()> {
        let m = patient::ActiveModel {
            id: Set(p.id),
            code: Set(p.code.clone()),
            form_data: Set(p.form_data.clone()),
            owner_id: Set(p.owner),
            created_by: NotSet,
            last_updated_by: Set(p.last_updated_by),
            created_at: NotSet,
            updated_at: Set(p.updated_at),
        };
        let _ = m.update(&self.conn).await.context("update patient failed")?;
        Ok(())
    }

    async fn delete(&self, scope: PatientScope, id: Uuid) -> anyhow::Result<bool> {
        let res = patient::Entity::delete_many()
            .filter(scope_condition(scope).add(patient::Column::Id.eq(id)))
            .exec(&self.conn)
            .await
            .context("delete patient failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn count_authored_by(&self, user_id: Uuid) -> anyhow::Result<u64> {
        patient::Entity::find()
            .filter(
                Condition::any()
                    .add(patient::Column::CreatedBy.eq(user_id))
                    .add(patient::Column::LastUpdatedBy.eq(user_id)),
            )
            .count(&self.conn)
            .await
            .context("count_authored_by failed")
    }
}
