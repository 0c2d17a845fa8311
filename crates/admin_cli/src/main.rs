use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{Actor, Engine, MemberRole, NewCompany, NewUser, Role};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "finledger_admin")]
#[command(about = "Admin utilities for FinLedger (bootstrap users/companies)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./finledger.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Company(Company),
    Member(Member),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    /// One of adminMaster, companyAdmin, companyUser, user.
    #[arg(long, value_parser = parse_role)]
    role: Role,
    #[arg(long)]
    phone: Option<String>,
    /// Links the new user to this company.
    #[arg(long)]
    company: Option<Uuid>,
    #[arg(long, value_parser = parse_member_role, default_value = "employee")]
    membership_role: MemberRole,
}

#[derive(Args, Debug)]
struct Company {
    #[command(subcommand)]
    command: CompanyCommand,
}

#[derive(Subcommand, Debug)]
enum CompanyCommand {
    Create(CompanyCreateArgs),
}

#[derive(Args, Debug)]
struct CompanyCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    cnpj: String,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Args, Debug)]
struct Member {
    #[command(subcommand)]
    command: MemberCommand,
}

#[derive(Subcommand, Debug)]
enum MemberCommand {
    Add(MemberAddArgs),
}

#[derive(Args, Debug)]
struct MemberAddArgs {
    #[arg(long)]
    company: Uuid,
    #[arg(long)]
    user: Uuid,
    #[arg(long, value_parser = parse_member_role, default_value = "employee")]
    role: MemberRole,
    #[arg(long)]
    position: Option<String>,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::try_from(raw).map_err(|err| err.to_string())
}

fn parse_member_role(raw: &str) -> Result<MemberRole, String> {
    MemberRole::try_from(raw).map_err(|err| err.to_string())
}

/// Operator running the CLI: full privileges, no memberships.
fn operator() -> Actor {
    Actor::new(Uuid::nil(), Some(Role::AdminMaster), [])
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;
    let actor = operator();

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let mut cmd = NewUser::new(args.name, args.email, args.role);
            if let Some(phone) = args.phone {
                cmd = cmd.phone(phone);
            }
            if let Some(company) = args.company {
                cmd = cmd.company(company, args.membership_role);
            }
            let user = engine.create_user(&actor, cmd).await?;
            println!("created user: {} ({})", user.email, user.id);
        }
        Command::Company(Company {
            command: CompanyCommand::Create(args),
        }) => {
            let mut cmd = NewCompany::new(args.name, args.cnpj);
            if let Some(email) = args.email {
                cmd = cmd.email(email);
            }
            let company = engine.create_company(&actor, cmd).await?;
            println!("created company: {} ({})", company.name, company.id);
        }
        Command::Member(Member {
            command: MemberCommand::Add(args),
        }) => {
            engine
                .add_member(
                    &actor,
                    args.company,
                    args.user,
                    args.role,
                    args.position.as_deref(),
                )
                .await?;
            println!("linked user {} to company {}", args.user, args.company);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_create() {
        let cli = Cli::try_parse_from([
            "finledger_admin",
            "user",
            "create",
            "--name",
            "Root",
            "--email",
            "root@example.com",
            "--role",
            "adminMaster",
        ])
        .unwrap();
        let Command::User(User {
            command: UserCommand::Create(args),
        }) = cli.command
        else {
            panic!("expected user create");
        };
        assert_eq!(args.role, Role::AdminMaster);
        assert_eq!(args.membership_role, MemberRole::Employee);
    }

    #[test]
    fn rejects_unknown_role() {
        let err = Cli::try_parse_from([
            "finledger_admin",
            "user",
            "create",
            "--name",
            "X",
            "--email",
            "x@example.com",
            "--role",
            "superuser",
        ]);
        assert!(err.is_err());
    }
}
