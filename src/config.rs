use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Credentials used to bootstrap the super admin account at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct SuperAdminConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub super_admin: Option<SuperAdminConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "storekeep".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "storekeep-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let super_admin = match (
            std::env::var("SUPER_ADMIN_EMAIL").ok(),
            std::env::var("SUPER_ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(SuperAdminConfig { email, password }),
            _ => None,
        };
        Ok(Self {
            database_url,
            jwt,
            super_admin,
        })
    }
}
