use std::net::SocketAddr;

use clap::Parser;
use ecometrix::cli::{
    ACCESS_SECRET_ENV, Args, REFRESH_SECRET_ENV, build_config, init_logging, load_secret,
    open_database,
};
use ecometrix::{create_app, init_cleanup};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Load .env before clap reads env fallbacks
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_format);

    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "Failed to load .env file");
        }
    }

    let Some(access_secret) = load_secret(ACCESS_SECRET_ENV, args.access_secret_file.as_deref())
    else {
        std::process::exit(1);
    };
    let Some(refresh_secret) =
        load_secret(REFRESH_SECRET_ENV, args.refresh_secret_file.as_deref())
    else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    init_cleanup(&db).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to read local address");
        std::process::exit(1);
    });

    let config = build_config(&args, db, access_secret, refresh_secret);
    let app = create_app(&config);

    info!(
        address = %local_addr,
        secure_cookies = config.secure_cookies,
        revoke_on_logout = config.revoke_on_logout,
        "Listening"
    );

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
