//! Schema checks for the `patients.owner_id` migration on SQLite.

mod common;

use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use sea_orm_migration::{MigratorTrait, SchemaManager};

use avc_forms::infra::storage::migrations::Migrator;
use common::create_test_db;

async fn pragma(db: &DatabaseConnection, sql: &str) -> Vec<sea_orm::QueryResult> {
    db.query_all(Statement::from_string(DatabaseBackend::Sqlite, sql.to_string()))
        .await
        .unwrap()
}

#[tokio::test]
async fn owner_column_is_nullable() {
    let db = create_test_db().await;

    let columns = pragma(&db, "PRAGMA table_info(patients)").await;
    let owner = columns
        .iter()
        .find(|c| c.try_get::<String>("", "name").unwrap() == "owner_id")
        .expect("owner_id column");
    assert_eq!(owner.try_get::<i32>("", "notnull").unwrap(), 0);
}

#[tokio::test]
async fn owner_foreign_key_sets_null() {
    let db = create_test_db().await;

    let fks = pragma(&db, "PRAGMA foreign_key_list(patients)").await;
    let owner_fk = fks
        .iter()
        .find(|fk| fk.try_get::<String>("", "from").unwrap() == "owner_id")
        .expect("owner_id foreign key");
    assert_eq!(owner_fk.try_get::<String>("", "table").unwrap(), "users");
    assert_eq!(owner_fk.try_get::<String>("", "on_delete").unwrap(), "SET NULL");

    // audit references refuse deletion instead
    for column in ["created_by", "last_updated_by"] {
        let fk = fks
            .iter()
            .find(|fk| fk.try_get::<String>("", "from").unwrap() == column)
            .expect("audit foreign key");
        assert_eq!(fk.try_get::<String>("", "on_delete").unwrap(), "RESTRICT");
    }
}

#[tokio::test]
async fn owner_column_is_indexed() {
    let db = create_test_db().await;
    let manager = SchemaManager::new(&db);
    assert!(manager
        .has_index("patients", "idx_patients_owner_id")
        .await
        .unwrap());
}

#[tokio::test]
async fn owner_migration_rolls_back_and_reapplies() {
    let db = create_test_db().await;

    Migrator::down(&db, Some(1)).await.unwrap();
    {
        let manager = SchemaManager::new(&db);
        assert!(!manager.has_column("patients", "owner_id").await.unwrap());
        assert!(manager.has_column("patients", "created_by").await.unwrap());
        assert!(manager
            .has_index("patients", "idx_patients_created_by")
            .await
            .unwrap());
    }

    Migrator::up(&db, None).await.unwrap();
    let manager = SchemaManager::new(&db);
    assert!(manager.has_column("patients", "owner_id").await.unwrap());
}
