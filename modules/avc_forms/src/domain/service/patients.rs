use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::contract::model::{NewPatient, Page, PageRequest, Patient, PatientPatch};
use crate::domain::error::DomainError;
use crate::domain::identity::Identity;
use crate::domain::policy::{require, PatientPermission, PatientScope};
use crate::domain::repo::{PatientsRepository, UsersRepository};
use crate::domain::service::ServiceConfig;

/// Patient records, scoped to what the requester may see.
#[derive(Clone)]
pub struct PatientsService {
    repo: Arc<dyn PatientsRepository>,
    users: Arc<dyn UsersRepository>,
    config: ServiceConfig,
}

impl PatientsService {
    pub fn new(
        repo: Arc<dyn PatientsRepository>,
        users: Arc<dyn UsersRepository>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repo,
            users,
            config,
        }
    }

    #[instrument(
        name = "avc_forms.patients.list",
        skip(self, ctx),
        fields(requester = %ctx.user_id(), superuser = ctx.is_superuser())
    )]
    pub async fn list_patients(
        &self,
        ctx: &Identity,
        req: PageRequest,
    ) -> Result<Page<Patient>, DomainError> {
        let (limit, offset) = self.config.window(req);
        let page = self
            .repo
            .list_page(PatientScope::for_identity(ctx), limit, offset)
            .await?;
        debug!("listed {} of {} patients", page.items.len(), page.total);
        Ok(page)
    }

    #[instrument(
        name = "avc_forms.patients.get",
        skip(self, ctx),
        fields(requester = %ctx.user_id(), patient_id = %id)
    )]
    pub async fn get_patient(&self, ctx: &Identity, id: Uuid) -> Result<Patient, DomainError> {
        self.find_visible(ctx, id).await
    }

    /// Audit fields come from `ctx`, never from the payload.
    #[instrument(
        name = "avc_forms.patients.create",
        skip(self, ctx, new_patient),
        fields(requester = %ctx.user_id())
    )]
    pub async fn create_patient(
        &self,
        ctx: &Identity,
        new_patient: NewPatient,
    ) -> Result<Patient, DomainError> {
        require(ctx, PatientPermission::Add)?;
        info!("Creating patient");

        let code = self.validate_code(new_patient.code)?;
        let form_data = validate_form_data(new_patient.form_data)?;
        self.validate_owner(new_patient.owner).await?;

        let now = Utc::now();
        let patient = Patient {
            id: Uuid::new_v4(),
            code,
            form_data,
            owner: new_patient.owner,
            created_by: ctx.created_by(),
            last_updated_by: ctx.updated_by(),
            created_at: now,
            updated_at: now,
        };

        self.repo.insert(&patient).await?;

        info!("Created patient with id={}", patient.id);
        Ok(patient)
    }

    /// `created_by` is preserved; `last_updated_by` becomes the requester.
    #[instrument(
        name = "avc_forms.patients.update",
        skip(self, ctx, patch),
        fields(requester = %ctx.user_id(), patient_id = %id)
    )]
    pub async fn update_patient(
        &self,
        ctx: &Identity,
        id: Uuid,
        patch: PatientPatch,
    ) -> Result<Patient, DomainError> {
        require(ctx, PatientPermission::Change)?;
        info!("Updating patient");

        let mut current = self.find_visible(ctx, id).await?;

        if let Some(code) = patch.code {
            current.code = self.validate_code(code)?;
        }
        if let Some(form_data) = patch.form_data {
            current.form_data = validate_form_data(Some(form_data))?;
        }
        if let Some(owner) = patch.owner {
            self.validate_owner(owner).await?;
            current.owner = owner;
        }

        current.last_updated_by = ctx.updated_by();
        current.updated_at = Utc::now();

        self.repo.update(&current).await?;

        info!("Updated patient");
        Ok(current)
    }

    #[instrument(
        name = "avc_forms.patients.delete",
        skip(self, ctx),
        fields(requester = %ctx.user_id(), patient_id = %id)
    )]
    pub async fn delete_patient(&self, ctx: &Identity, id: Uuid) -> Result<(), DomainError> {
        require(ctx, PatientPermission::Delete)?;
        info!("Deleting patient");

        let deleted = self
            .repo
            .delete(PatientScope::for_identity(ctx), id)
            .await?;
        if !deleted {
            return Err(DomainError::patient_not_found(id));
        }

        info!("Deleted patient");
        Ok(())
    }

    async fn find_visible(&self, ctx: &Identity, id: Uuid) -> Result<Patient, DomainError> {
        self.repo
            .find(PatientScope::for_identity(ctx), id)
            .await?
            .ok_or_else(|| DomainError::patient_not_found(id))
    }

    fn validate_code(&self, code: String) -> Result<String, DomainError> {
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(DomainError::validation("code", "This field may not be blank."));
        }
        if code.chars().count() > self.config.max_code_length {
            return Err(DomainError::validation(
                "code",
                format!(
                    "Ensure this field has no more than {} characters.",
                    self.config.max_code_length
                ),
            ));
        }
        Ok(code)
    }

    async fn validate_owner(&self, owner: Option<Uuid>) -> Result<(), DomainError> {
        let Some(owner_id) = owner else {
            return Ok(());
        };
        if self.users.find_by_id(owner_id).await?.is_none() {
            return Err(DomainError::validation(
                "owner",
                format!("Invalid pk \"{owner_id}\" - object does not exist."),
            ));
        }
        Ok(())
    }
}

fn validate_form_data(form_data: Option<Value>) -> Result<Value, DomainError> {
    match form_data {
        None | Some(Value::Null) => Ok(Value::Object(Map::new())),
        Some(v @ Value::Object(_)) => Ok(v),
        Some(_) => Err(DomainError::validation(
            "form_data",
            "Expected a JSON object.",
        )),
    }
}
