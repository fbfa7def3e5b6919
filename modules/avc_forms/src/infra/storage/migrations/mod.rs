use sea_orm_migration::prelude::*;

mod m20201125_000001_create_users;
mod m20201125_000002_create_patients;
mod m20201125_000003_patient_owner;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20201125_000001_create_users::Migration),
            Box::new(m20201125_000002_create_patients::Migration),
            Box::new(m20201125_000003_patient_owner::Migration),
        ]
    }
}
