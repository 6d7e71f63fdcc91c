//! `dimcli init` — interactive credentials-file setup.
//!
//! Prompts for an instance name, endpoint, username and password, checks them
//! by logging in, and writes an `[instance.<name>]` section to
//! `~/.dimensions/dsl.ini`.

use crate::config::{self, Credentials, DEFAULT_ENDPOINT, DEFAULT_INSTANCE};
use crate::error::{DslError, Result};
use crate::DslClient;
use std::path::Path;

/// Answers collected by the wizard (or supplied up front).
#[derive(Debug, Default)]
pub struct SetupAnswers {
    pub instance: Option<String>,
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn prompt_text(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut input = dialoguer::Input::<String>::new().with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default.to_string());
    }
    input
        .interact_text()
        .map_err(|e| DslError::Config(format!("Failed to read input: {}", e)))
}

fn prompt_password() -> Result<String> {
    let password: String = dialoguer::Password::new()
        .with_prompt("  Password")
        .interact()
        .map_err(|e| DslError::Config(format!("Failed to read password: {}", e)))?;
    if password.is_empty() {
        return Err(DslError::Config("Password cannot be empty".to_string()));
    }
    Ok(password)
}

/// Fill in missing answers interactively. With `yes`, missing values fall back
/// to defaults where they exist and are an error otherwise.
fn resolve_answers(answers: SetupAnswers, yes: bool) -> Result<(String, Credentials)> {
    let instance = match answers.instance {
        Some(i) => i,
        None if yes => DEFAULT_INSTANCE.to_string(),
        None => prompt_text("  Instance name", Some(DEFAULT_INSTANCE))?,
    };
    let endpoint = match answers.endpoint {
        Some(e) => e,
        None if yes => DEFAULT_ENDPOINT.to_string(),
        None => prompt_text("  Endpoint URL", Some(DEFAULT_ENDPOINT))?,
    };
    let username = match answers.username {
        Some(u) => u,
        None if yes => {
            return Err(DslError::Config(
                "A username is required with --yes".to_string(),
            ))
        }
        None => prompt_text("  Username", None)?,
    };
    let password = match answers.password {
        Some(p) => p,
        None if yes => {
            return Err(DslError::Config(
                "A password is required with --yes".to_string(),
            ))
        }
        None => prompt_password()?,
    };

    Ok((instance, Credentials::new(endpoint, username, password)?))
}

/// Check the credentials by logging in.
async fn validate_credentials(credentials: &Credentials) -> Result<()> {
    match DslClient::connect(credentials.clone()).await {
        Ok(_) => {
            println!("  Logging in... OK");
            Ok(())
        }
        Err(DslError::Authentication { status, .. }) => Err(DslError::Config(format!(
            "Login failed (HTTP {}). Check your username and password.",
            status
        ))),
        Err(e) => {
            println!("  Logging in... WARNING: could not reach API ({})", e);
            println!("  Continuing anyway, credentials will be saved.");
            Ok(())
        }
    }
}

fn confirm_overwrite(path: &Path, instance: &str, yes: bool) -> bool {
    if yes || Credentials::from_file(path, instance).is_err() {
        return true;
    }
    dialoguer::Confirm::new()
        .with_prompt(format!(
            "  Instance '{}' already exists in {}. Overwrite?",
            instance,
            path.display()
        ))
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// Run the setup wizard.
pub async fn run_setup(answers: SetupAnswers, skip_validation: bool, yes: bool) -> Result<()> {
    println!();
    println!("dimcli init \u{2014} Dimensions API credentials");
    println!("=======================================");
    println!();

    // 1. Collect credentials.
    println!("Instance details...");
    let (instance, credentials) = resolve_answers(answers, yes)?;
    println!();

    // 2. Validate.
    if !skip_validation {
        validate_credentials(&credentials).await?;
    } else {
        println!("  Skipping validation (--skip-validation).");
    }
    println!();

    // 3. Write the credentials file.
    let path = config::default_config_path()?;
    if !confirm_overwrite(&path, &instance, yes) {
        println!("Nothing written.");
        return Ok(());
    }
    config::write_profile(&path, &instance, &credentials)?;

    println!("Saved instance '{}' to {}", instance, path.display());
    println!("Try: dimcli --instance {} query \"search publications return publications\"", instance);
    Ok(())
}
