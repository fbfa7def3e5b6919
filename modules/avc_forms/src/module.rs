use std::sync::Arc;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::{openapi, routes};
use crate::config::AvcFormsConfig;
use crate::domain::service::{PatientsService, ServiceConfig, UsersService};
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::{SeaOrmPatientsRepository, SeaOrmUsersRepository};

/// The avc_forms module: repositories wired to services, exposed over REST.
#[derive(Clone)]
pub struct AvcForms {
    users: Arc<UsersService>,
    patients: Arc<PatientsService>,
}

impl AvcForms {
    pub fn new(db: DatabaseConnection, cfg: &AvcFormsConfig) -> Self {
        info!("Initializing avc_forms module");
        debug!(
            "Loaded avc_forms config: default_page_size={}, max_page_size={}, max_code_length={}",
            cfg.default_page_size, cfg.max_page_size, cfg.max_code_length
        );

        // Wire repositories (infra) to domain services (ports)
        let users_repo = Arc::new(SeaOrmUsersRepository::new(db.clone()));
        let patients_repo = Arc::new(SeaOrmPatientsRepository::new(db));
        let service_config = ServiceConfig::from(cfg);

        let users = UsersService::new(
            users_repo.clone(),
            patients_repo.clone(),
            service_config.clone(),
        );
        let patients = PatientsService::new(patients_repo, users_repo, service_config);

        Self {
            users: Arc::new(users),
            patients: Arc::new(patients),
        }
    }

    /// Apply pending schema migrations.
    pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running avc_forms database migrations");
        Migrator::up(db, None).await?;
        info!("avc_forms database migrations completed successfully");
        Ok(())
    }

    /// Resource routes, relative to the API prefix.
    pub fn router(&self) -> axum::Router {
        info!("Registering avc_forms REST routes");
        routes::register_routes(axum::Router::new(), self.users.clone(), self.patients.clone())
    }

    pub fn openapi(&self, prefix: &str) -> utoipa::openapi::OpenApi {
        openapi::openapi(prefix)
    }

    pub fn users(&self) -> &Arc<UsersService> {
        &self.users
    }

    pub fn patients(&self) -> &Arc<PatientsService> {
        &self.patients
    }
}
