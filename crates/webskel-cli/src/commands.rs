//! Subcommand handlers. Each one drives an auth flow from `webskel_core`
//! and prints the outcome.

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::warn;

use webskel_core::auth::{self, SessionStore, StorageKind};
use webskel_core::{ApiClient, Config, RegisterRequest, User};

/// Read a line from stdin after printing `label`
fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// Password from the flag, then `WEBSKEL_PASSWORD`, then an interactive prompt
fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password.or_else(|| std::env::var("WEBSKEL_PASSWORD").ok()) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

fn print_profile(user: &User) {
    println!("{}", user.display_name());
    println!("  id:         {}", user.id);
    println!("  email:      {}", user.email);
    println!("  active:     {}", if user.is_active { "yes" } else { "no" });
    if user.is_superuser {
        println!("  superuser:  yes");
    }
    if let Some(last_login) = user.last_login {
        println!("  last login: {}", last_login.format("%b %d, %Y %H:%M UTC"));
    }
    if let Some(count) = user.login_count {
        println!("  logins:     {}", count);
    }
}

pub async fn login(
    api: &ApiClient,
    session: &SessionStore,
    config: &mut Config,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    // Get credentials from flags, env vars or config
    let email = match email
        .or_else(|| std::env::var("WEBSKEL_EMAIL").ok())
        .or_else(|| config.last_email.clone())
    {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    if email.is_empty() {
        anyhow::bail!("An email address is required");
    }
    let password = password_or_prompt(password)?;

    let user = auth::sign_in(api, session, &email, &password).await?;
    println!("Signed in as {}", user.display_name());

    if config.last_email.as_deref() != Some(email.as_str()) {
        config.last_email = Some(email);
        if let Err(e) = config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
    Ok(())
}

pub async fn register(
    api: &ApiClient,
    session: &SessionStore,
    email: String,
    full_name: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let password = password_or_prompt(password)?;
    let mut request = RegisterRequest::new(email, password);
    if let Some(name) = full_name {
        request = request.with_full_name(name);
    }

    let outcome = auth::sign_up(api, session, &request).await?;
    match (&outcome.user, outcome.signed_in) {
        (Some(user), true) => println!("Account created, signed in as {}", user.display_name()),
        (Some(user), false) if !user.is_active => {
            println!("Account created for {}; it must be activated before signing in", user.email)
        }
        _ => println!("Account created for {}", request.email),
    }
    Ok(())
}

pub fn logout(session: &SessionStore) -> Result<()> {
    let was_signed_in = session.is_authenticated();
    auth::sign_out(session)?;
    if was_signed_in {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
    Ok(())
}

pub async fn whoami(api: &ApiClient, session: &SessionStore) -> Result<()> {
    if !session.is_authenticated() {
        anyhow::bail!("Not signed in. Run `webskel login` first.");
    }
    let user = auth::verify(api).await?;
    print_profile(&user);
    Ok(())
}

pub fn status(session: &SessionStore, base_url: &str, storage: StorageKind) {
    let state = session.snapshot();
    match state.user() {
        Some(user) if state.is_authenticated() => {
            println!("Signed in as {} <{}>", user.display_name(), user.email)
        }
        _ => println!("Not signed in"),
    }
    println!("  api:     {}", base_url);
    println!("  storage: {:?}", storage);
}
