//! Adds `patients.owner_id`: nullable, indexed, and cleared when the
//! referenced user is deleted.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let conn = manager.get_connection();

        if manager.has_column("patients", "owner_id").await? {
            return Ok(());
        }

        let sql = match backend {
            sea_orm::DatabaseBackend::Postgres => {
                r"
ALTER TABLE patients ADD COLUMN owner_id UUID NULL;
ALTER TABLE patients
    ADD CONSTRAINT fk_patients_owner FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL;
CREATE INDEX IF NOT EXISTS idx_patients_owner_id ON patients(owner_id);
                "
            }
            sea_orm::DatabaseBackend::MySql => {
                r"
ALTER TABLE patients ADD COLUMN owner_id VARCHAR(36) NULL;
ALTER TABLE patients
    ADD CONSTRAINT fk_patients_owner FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL;
CREATE INDEX idx_patients_owner_id ON patients(owner_id);
                "
            }
            // SQLite accepts a REFERENCES clause on ADD COLUMN when the default is NULL.
            sea_orm::DatabaseBackend::Sqlite => {
                r"
ALTER TABLE patients ADD COLUMN owner_id TEXT NULL REFERENCES users(id) ON DELETE SET NULL;
CREATE INDEX IF NOT EXISTS idx_patients_owner_id ON patients(owner_id);
                "
            }
        };

        conn.execute_unprepared(sql).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let conn = manager.get_connection();

        let sql = match backend {
            sea_orm::DatabaseBackend::Postgres => {
                r"
DROP INDEX IF EXISTS idx_patients_owner_id;
ALTER TABLE patients DROP CONSTRAINT IF EXISTS fk_patients_owner;
ALTER TABLE patients DROP COLUMN IF EXISTS owner_id;
                "
            }
            sea_orm::DatabaseBackend::MySql => {
                r"
ALTER TABLE patients DROP FOREIGN KEY fk_patients_owner;
DROP INDEX idx_patients_owner_id ON patients;
ALTER TABLE patients DROP COLUMN owner_id;
                "
            }
            // DROP COLUMN is refused for a column inside a foreign key, so rebuild the table.
            sea_orm::DatabaseBackend::Sqlite => {
                r"
DROP INDEX IF EXISTS idx_patients_owner_id;
CREATE TABLE patients_without_owner (
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
INSERT INTO patients_without_owner
    SELECT id, code, form_data, created_by, last_updated_by, created_at, updated_at FROM patients;
DROP TABLE patients;
ALTER TABLE patients_without_owner RENAME TO patients;
CREATE INDEX IF NOT EXISTS idx_patients_created_by ON patients(created_by);
CREATE INDEX IF NOT EXISTS idx_patients_last_updated_by ON patients(last_updated_by);
CREATE INDEX IF NOT EXISTS idx_patients_created_at ON patients(created_at);
                "
            }
        };

        conn.execute_unprepared(sql).await?;
        Ok(())
    }
}
