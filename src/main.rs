mod app;
mod auth;
mod config;
mod domain;
mod error;
mod inventory;
mod pagination;
mod state;
mod users;
mod validation;

use domain::policy::Role;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "storekeep=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }

    ensure_super_admin(&app_state).await?;

    let app = app::build_app(app_state);
    app::serve(app).await
}

/// Create the super admin from SUPER_ADMIN_EMAIL / SUPER_ADMIN_PASSWORD if no
/// active super admin exists yet.
async fn ensure_super_admin(state: &AppState) -> anyhow::Result<()> {
    if users::repo::find_super_admin(&state.db).await?.is_some() {
        tracing::debug!("super admin already exists");
        return Ok(());
    }

    let Some(credentials) = state.config.super_admin.as_ref() else {
        tracing::warn!(
            "SUPER_ADMIN_EMAIL or SUPER_ADMIN_PASSWORD not set; skipping super admin creation"
        );
        return Ok(());
    };

    let email = validation::normalize_email(&credentials.email);
    let hash = auth::password::hash_password(&credentials.password)?;
    let user = users::repo::create(
        &state.db,
        "Super Admin",
        &email,
        &hash,
        None,
        Role::SuperAdmin,
    )
    .await?;
    tracing::info!(user_id = %user.id, "super admin initialized from environment");
    Ok(())
}
