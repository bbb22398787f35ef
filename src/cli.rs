//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{ADMIN_ROLE, Database};
use crate::server_config::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, ServerSettings};
use crate::session::normalize_email;
use clap::Parser;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "gatehouse",
    about = "Access and refresh token service with cookie sessions"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7292")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "gatehouse.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_TTL", default_value_t = DEFAULT_ACCESS_TTL_SECS)]
    pub access_ttl: u64,

    /// Refresh token lifetime in seconds (must exceed the access token lifetime)
    #[arg(long, env = "REFRESH_TOKEN_TTL", default_value_t = DEFAULT_REFRESH_TTL_SECS)]
    pub refresh_ttl: u64,

    /// bcrypt cost for new password hashes (4-31)
    #[arg(long, env = "HASH_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub hash_cost: u32,

    /// Mark cookies `Secure; SameSite=None` (serve over HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Read client IPs from X-Forwarded-For (only behind a reverse proxy)
    #[arg(long)]
    pub trust_proxy: bool,

    /// Disable per-IP rate limits on /register and /login
    #[arg(long)]
    pub no_rate_limit: bool,

    /// Grant the admin role to an existing user and exit
    #[arg(long, value_name = "EMAIL")]
    pub grant_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} bytes. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Build and validate server settings from arguments.
/// Returns None and logs an error if validation fails.
pub fn build_settings(args: &Args) -> Option<ServerSettings> {
    let settings = ServerSettings {
        access_ttl_secs: args.access_ttl,
        refresh_ttl_secs: args.refresh_ttl,
        hash_cost: args.hash_cost,
        secure_cookies: args.secure_cookies,
        trust_proxy: args.trust_proxy,
    };

    if let Err(e) = settings.validate() {
        error!(error = %e, "Invalid configuration");
        return None;
    }

    Some(settings)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    jwt_secret: String,
    settings: ServerSettings,
    no_rate_limit: bool,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        settings,
        rate_limit: !no_rate_limit,
    }
}

/// Handle the --grant-admin flag: add the admin role to an existing user.
/// The user must log in again for the role to appear in their access token.
pub async fn handle_grant_admin(db: &Database, email: &str) -> Result<(), String> {
    let email = normalize_email(email);

    let user = db
        .users()
        .get_by_email(&email)
        .await
        .map_err(|e| format!("Failed to look up user: {}", e))?
        .ok_or_else(|| format!("No user registered with email {}", email))?;

    if user.has_role(ADMIN_ROLE) {
        println!("{} is already an admin", user.email);
        return Ok(());
    }

    let mut roles = user.roles.clone();
    roles.push(ADMIN_ROLE.to_string());
    db.users()
        .set_roles(&user.id, &roles)
        .await
        .map_err(|e| format!("Failed to update roles: {}", e))?;

    info!(user_id = %user.id, "Admin role granted");
    println!("Granted admin role to {}", user.email);
    Ok(())
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
