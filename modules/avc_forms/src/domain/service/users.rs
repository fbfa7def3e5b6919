use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{NewUser, Page, PageRequest, User, UserPatch};
use crate::domain::error::DomainError;
use crate::domain::identity::Identity;
use crate::domain::password;
use crate::domain::policy::PatientPermission;
use crate::domain::repo::{PatientsRepository, UsersRepository};
use crate::domain::service::ServiceConfig;

const MAX_NAME_LENGTH: usize = 150;
const MIN_PASSWORD_LENGTH: usize = 8;

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-')
}

/// Identity management and credential checks.
#[derive(Clone)]
pub struct UsersService {
    repo: Arc<dyn UsersRepository>,
    patients: Arc<dyn PatientsRepository>,
    config: ServiceConfig,
}

impl UsersService {
    pub fn new(
        repo: Arc<dyn UsersRepository>,
        patients: Arc<dyn PatientsRepository>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repo,
            patients,
            config,
        }
    }

    /// Resolve Basic credentials into an [`Identity`] and stamp `last_login`.
    #[instrument(name = "avc_forms.users.authenticate", skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, DomainError> {
        let Some((user, stored)) = self.repo.find_credentials(username).await? else {
            debug!("unknown username");
            return Err(DomainError::unauthenticated("Invalid username/password."));
        };

        if !password::verify(password, &stored)? {
            debug!("password mismatch");
            return Err(DomainError::unauthenticated("Invalid username/password."));
        }
        if !user.is_active {
            return Err(DomainError::unauthenticated("User inactive or deleted."));
        }

        if let Err(e) = self.repo.touch_last_login(user.id, Utc::now()).await {
            warn!("failed to record last_login (continuing): {e:#}");
        }
        Ok(Identity::from_user(&user))
    }

    #[instrument(name = "avc_forms.users.list", skip(self))]
    pub async fn list_users(&self, req: PageRequest) -> Result<Page<User>, DomainError> {
        let (limit, offset) = self.config.window(req);
        let page = self.repo.list_page(limit, offset).await?;
        debug!("listed {} of {} users", page.items.len(), page.total);
        Ok(page)
    }

    #[instrument(name = "avc_forms.users.get", skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: Uuid) -> Result<User, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(
        name = "avc_forms.users.create",
        skip(self, new_user),
        fields(username = %new_user.username, superuser = new_user.is_superuser)
    )]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating user");

        validate_username(&new_user.username)?;
        validate_email(&new_user.email)?;
        validate_name("first_name", &new_user.first_name)?;
        validate_name("last_name", &new_user.last_name)?;
        validate_password(&new_user.password)?;

        if self.repo.username_taken(&new_user.username, None).await? {
            return Err(DomainError::username_already_exists(new_user.username));
        }

        let password_hash = password::hash(&new_user.password)?;
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            is_active: new_user.is_active,
            is_staff: new_user.is_staff,
            is_superuser: new_user.is_superuser,
            date_joined: Utc::now(),
            last_login: None,
            permissions: Vec::new(),
        };

        self.repo.insert(&user, &password_hash).await?;

        info!("Created user with id={}", user.id);
        Ok(user)
    }

    #[instrument(name = "avc_forms.users.update", skip(self, patch), fields(user_id = %id))]
    pub async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User, DomainError> {
        info!("Updating user");

        let mut current = self.get_user(id).await?;

        if let Some(username) = patch.username {
            validate_username(&username)?;
            if username != current.username && self.repo.username_taken(&username, Some(id)).await? {
                return Err(DomainError::username_already_exists(username));
            }
            current.username = username;
        }
        if let Some(email) = patch.email {
            validate_email(&email)?;
            current.email = email;
        }
        if let Some(first_name) = patch.first_name {
            validate_name("first_name", &first_name)?;
            current.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            validate_name("last_name", &last_name)?;
            current.last_name = last_name;
        }
        if let Some(is_active) = patch.is_active {
            current.is_active = is_active;
        }

        let new_hash = match patch.password {
            Some(ref pw) => {
                validate_password(pw)?;
                Some(password::hash(pw)?)
            }
            None => None,
        };

        self.repo.update(&current).await?;
        if let Some(hash) = new_hash {
            self.repo.set_password(id, &hash).await?;
        }

        info!("Updated user");
        Ok(current)
    }

    /// Patients owned by the user survive with their owner cleared; users
    /// still recorded as creator or last updater cannot be deleted.
    #[instrument(name = "avc_forms.users.delete", skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), DomainError> {
        info!("Deleting user");

        if self.patients.count_authored_by(id).await? > 0 {
            return Err(DomainError::user_in_use(id));
        }
        if !self.repo.delete(id).await? {
            return Err(DomainError::user_not_found(id));
        }

        info!("Deleted user");
        Ok(())
    }

    /// Grant patient model permissions by username.
    #[instrument(name = "avc_forms.users.grant", skip(self))]
    pub async fn grant_permissions(
        &self,
        username: &str,
        codenames: &[String],
    ) -> Result<User, DomainError> {
        let (user, _) = self
            .repo
            .find_credentials(username)
            .await?
            .ok_or_else(|| DomainError::validation("username", format!("no user named '{username}'")))?;

        for codename in codenames {
            if PatientPermission::from_codename(codename).is_none() {
                return Err(DomainError::validation(
                    "permission",
                    format!("unknown permission '{codename}'"),
                ));
            }
        }
        for codename in codenames {
            self.repo.grant_permission(user.id, codename).await?;
        }

        self.get_user(user.id).await
    }
}

// --- validation helpers ---

fn validate_username(username: &str) -> Result<(), DomainError> {
    if username.is_empty() {
        return Err(DomainError::validation("username", "This field may not be blank."));
    }
    if username.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::validation(
            "username",
            format!("Ensure this field has no more than {MAX_NAME_LENGTH} characters."),
        ));
    }
    if !username.chars().all(is_username_char) {
        return Err(DomainError::validation(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    // blank is allowed
    if email.is_empty() {
        return Ok(());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(DomainError::validation("email", "Enter a valid email address.")),
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), DomainError> {
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::validation(
            field,
            format!("Ensure this field has no more than {MAX_NAME_LENGTH} characters."),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(DomainError::validation(
            "password",
            format!("This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("dr.house+1@clinic").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(151)).is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("").is_ok());
        assert!(validate_email("nurse@clinic.org").is_ok());
        assert!(validate_email("nurse").is_err());
        assert!(validate_email("@clinic.org").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }
}
