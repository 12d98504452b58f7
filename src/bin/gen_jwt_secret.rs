//! Print a fresh JWT signing secret, optionally writing it into an env file.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use storefront::auth::generate_secret;
use storefront::config::JWT_SECRET;

#[derive(Parser, Debug)]
#[command(name = "gen-jwt-secret", about = "Generate a random 64-byte hex JWT secret")]
struct Args {
    /// Insert or replace JWT_SECRET in this env file instead of only printing it.
    #[arg(long, value_name = "PATH")]
    write: Option<PathBuf>,
}

/// Replace the first `KEY=` line (commented-out lines are left alone) or append one.
fn upsert_env_var(contents: &str, key: &str, value: &str) -> String {
    let prefix = format!("{}=", key);
    let line = format!("{}{}", prefix, value);
    let mut replaced = false;
    let mut out: Vec<String> = contents
        .lines()
        .map(|l| {
            if !replaced && l.trim_start().starts_with(&prefix) {
                replaced = true;
                line.clone()
            } else {
                l.to_string()
            }
        })
        .collect();
    if !replaced {
        out.push(line);
    }
    let mut text = out.join("\n");
    text.push('\n');
    text
}

fn main() -> ExitCode {
    let args = Args::parse();
    let secret = generate_secret();
    let Some(path) = args.write else {
        println!("{}", secret);
        return ExitCode::SUCCESS;
    };

    let existing = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            eprintln!("cannot read {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = std::fs::write(&path, upsert_env_var(&existing, JWT_SECRET, &secret)) {
        eprintln!("cannot write {}: {}", path.display(), e);
        return ExitCode::FAILURE;
    }
    println!("wrote {} to {}", JWT_SECRET, path.display());
    ExitCode::SUCCESS
}
