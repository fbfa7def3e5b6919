use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let conn = manager.get_connection();

        // Audit references are mandatory, so deleting a referenced user is refused.
        let sql = match backend {
            sea_orm::DatabaseBackend::Postgres => {
                r"
CREATE TABLE IF NOT EXISTS patients (
    id UUID PRIMARY KEY NOT NULL,
    code VARCHAR(255) NOT NULL,
    form_data JSONB NOT NULL DEFAULT '{}',
    created_by UUID NOT NULL,
    last_updated_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT fk_patients_created_by FOREIGN KEY (created_by) REFERENCES users(id) ON DELETE RESTRICT,
    CONSTRAINT fk_patients_last_updated_by FOREIGN KEY (last_updated_by) REFERENCES users(id) ON DELETE RESTRICT
);

CREATE INDEX IF NOT EXISTS idx_patients_created_by ON patients(created_by);
CREATE INDEX IF NOT EXISTS idx_patients_last_updated_by ON patients(last_updated_by);
CREATE INDEX IF NOT EXISTS idx_patients_created_at ON patients(created_at);
                "
            }
            sea_orm::DatabaseBackend::MySql => {
                r"
CREATE TABLE IF NOT EXISTS patients (
    id VARCHAR(36) PRIMARY KEY NOT NULL,
    code VARCHAR(255) NOT NULL,
    form_data JSON NOT NULL,
    created_by VARCHAR(36) NOT NULL,
    last_updated_by VARCHAR(36) NOT NULL,
    created_at TIMESTAMP NOT NULL,
    updated_at TIMESTAMP NOT NULL,
    INDEX idx_patients_created_by (created_by),
    INDEX idx_patients_last_updated_by (last_updated_by),
    INDEX idx_patients_created_at (created_at),
    CONSTRAINT fk_patients_created_by FOREIGN KEY (created_by) REFERENCES users(id) ON DELETE RESTRICT,
    CONSTRAINT fk_patients_last_updated_by FOREIGN KEY (last_updated_by) REFERENCES users(id) ON DELETE RESTRICT
);
                "
            }
            sea_orm::DatabaseBackend::Sqlite => {
                r"
CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY NOT NULL,
    code TEXT NOT NULL,
    form_data TEXT NOT NULL DEFAULT '{}',
    created_by TEXT NOT NULL,
    last_updated_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (created_by) REFERENCES users(id) ON DELETE RESTRICT,
    FOREIGN KEY (last_updated_by) REFERENCES users(id) ON DELETE RESTRICT
);

CREATE INDEX IF NOT EXISTS idx_patients_created_by ON patients(created_by);
CREATE INDEX IF NOT EXISTS idx_patients_last_updated_by ON patients(last_updated_by);
CREATE INDEX IF NOT EXISTS idx_patients_created_at ON patients(created_at);
                "
            }
        };

        conn.execute_unprepared(sql).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        conn.execute_unprepared("DROP TABLE IF EXISTS patients;")
            .await?;
        Ok(())
    }
}
