#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Actor, Engine, MoneyCents, NewTransaction, Role, Transaction, TransactionKind};
use migration::MigratorTrait;
use uuid::Uuid;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// Inserts a user with a raw level id (`None` = no level).
pub async fn insert_user_level(db: &DatabaseConnection, name: &str, level: Option<i32>) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (id, name, email, user_level_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
        vec![
            id.to_string().into(),
            name.into(),
            format!("{}@example.com", id.simple()).into(),
            level.into(),
            now.into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
    id
}

pub async fn insert_user(db: &DatabaseConnection, name: &str, role: Role) -> Uuid {
    insert_user_level(db, name, Some(role.rank())).await
}

pub async fn insert_company(db: &DatabaseConnection, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO companies (id, name, cnpj, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        vec![
            id.to_string().into(),
            name.into(),
            id.simple().to_string()[..14].to_string().into(),
            now.into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
    id
}

pub async fn link(db: &DatabaseConnection, company_id: Uuid, user_id: Uuid) {
    let now = Utc::now();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO company_user (id, company_id, user_id, role, created_at, updated_at) \
         VALUES (?, ?, ?, 'employee', ?, ?)",
        vec![
            Uuid::new_v4().to_string().into(),
            company_id.to_string().into(),
            user_id.to_string().into(),
            now.into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn cents(value: i64) -> MoneyCents {
    MoneyCents::new(value)
}

/// Records a transaction through an AdminMaster so any owner/company pair
/// can be seeded.
pub async fn seed_tx(
    engine: &Engine,
    master: &Actor,
    owner: Uuid,
    company: Option<Uuid>,
    kind: TransactionKind,
    amount_cents: i64,
    date: NaiveDate,
) -> Transaction {
    let mut cmd = NewTransaction::new(kind, cents(amount_cents), date).user_id(owner);
    cmd.company_id = company;
    engine.create_transaction(master, cmd).await.unwrap()
}
