//! Provision an operator account, or promote an existing one.
//!
//! `seed-admin --email ops@shop.test --password 's3cret!' --role owner`

use clap::Parser;
use std::process::ExitCode;
use storefront::auth::hash_password;
use storefront::config::{require, validate_database_url, DATABASE_URL};
use storefront::mapper::user::{normalize_email, provisioned, MIN_PASSWORD_LENGTH};
use storefront::model::Role;
use storefront::{ensure_tables, init_tracing, open_database, UserService};

#[derive(Parser, Debug)]
#[command(name = "seed-admin", about = "Create or promote an admin, owner or staff account")]
struct Args {
    #[arg(long, default_value = "Administrator")]
    name: String,
    #[arg(long, env = "ADMIN_EMAIL")]
    email: String,
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, default_value = "admin", value_parser = parse_staff_role)]
    role: Role,
}

fn parse_staff_role(raw: &str) -> Result<Role, String> {
    let role: Role = raw.trim().to_lowercase().parse().map_err(|e| format!("{}", e))?;
    if role.is_staff() {
        Ok(role)
    } else {
        Err(format!("role must be one of admin, owner, staff (got '{}')", raw))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("seed-admin: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!("password must be at least {} characters", MIN_PASSWORD_LENGTH).into());
    }
    let database_url = require(&|k: &str| std::env::var(k).ok(), DATABASE_URL)?;
    validate_database_url(&database_url)?;
    let pool = open_database(&database_url, &Default::default()).await?;
    ensure_tables(&pool).await?;

    let hash = hash_password(&args.password)?;
    let new_user = provisioned(&args.name, &args.email, hash, args.role);
    let (user, created) = UserService::provision(&pool, new_user).await?;
    let verb = if created { "created" } else { "updated" };
    println!("{} {} account {} ({})", verb, user.role, normalize_email(&args.email), user.id);
    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_staff_roles_are_accepted() {
        assert_eq!(parse_staff_role("Owner").unwrap(), Role::Owner);
        assert_eq!(parse_staff_role("staff").unwrap(), Role::Staff);
        assert!(parse_staff_role("customer").is_err());
        assert!(parse_staff_role("root").is_err());
    }

    #[test]
    fn args_parse_with_defaults() {
        let args = Args::try_parse_from(["seed-admin", "--email", "a@b.co", "--password", "secret1"]).unwrap();
        assert_eq!(args.role, Role::Admin);
        assert_eq!(args.name, "Administrator");
    }
}
