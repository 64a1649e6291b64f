use std::io::BufRead;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Password};

use eqlens_db::Database;

#[derive(Subcommand, Debug)]
pub enum AdminAction {
    /// Create a dashboard administrator
    CreateUser {
        username: String,

        /// Read the password from the first line of stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },

    /// List administrators
    ListUsers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove an administrator
    DeleteUser {
        username: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub fn handle_admin_command(db: &Database, action: AdminAction) -> Result<()> {
    match action {
        AdminAction::CreateUser {
            username,
            password_stdin,
        } => {
            let password = if password_stdin {
                read_password_line()?
            } else {
                Password::new()
                    .with_prompt(format!("Password for {}", username))
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()?
            };

            if password.is_empty() {
                anyhow::bail!("Password must not be empty");
            }

            db.admin_users().create(&username, &password)?;
            println!("{} {}", "Created admin".bright_green(), username.bold());
        }
        AdminAction::ListUsers { json } => {
            let users = db.admin_users().list()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else if users.is_empty() {
                println!("{}", "No admin users.".dimmed());
            } else {
                println!("{:<24} {}", "USERNAME".dimmed(), "CREATED".dimmed());
                for user in users {
                    println!(
                        "{:<24} {}",
                        user.username,
                        user.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        AdminAction::DeleteUser { username, yes } => {
            if !yes
                && !Confirm::new()
                    .with_prompt(format!("Delete admin {}?", username))
                    .default(false)
                    .interact()?
            {
                return Ok(());
            }

            if db.admin_users().delete(&username)? {
                println!("{} {}", "Deleted admin".bright_yellow(), username.bold());
            } else {
                anyhow::bail!("No admin named {}", username);
            }
        }
    }

    Ok(())
}

fn read_password_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
