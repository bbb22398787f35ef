use clap::Parser;
use gatehouse::cli::{
    Args, build_config, build_settings, handle_grant_admin, init_logging, load_jwt_secret,
    open_database,
};
use gatehouse::{init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = args.grant_admin.as_deref() {
        if let Err(e) = handle_grant_admin(&db, email).await {
            error!(error = %e, "Failed to grant admin role");
            std::process::exit(1);
        }
        return;
    }

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(settings) = build_settings(&args) else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(
            address = %local_addr,
            access_ttl = settings.access_ttl_secs,
            refresh_ttl = settings.refresh_ttl_secs,
            "Listening"
        ),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    init_cleanup(&db).await;

    let config = build_config(db, jwt_secret, settings, args.no_rate_limit);
    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
