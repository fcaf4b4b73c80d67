use serde::Deserialize;

const DEFAULT_ORIGINS: &str =
    "https://keen-druid-4a6c5c.netlify.app,http://localhost:5500,http://localhost:3000";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    pub ttl_minutes: i64,
    pub link_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs the service on in-memory stores.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub reset: ResetConfig,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 12 * 60),
        };
        let password = PasswordConfig {
            memory_kib: env_parse("ARGON2_MEMORY_KIB", argon2::Params::DEFAULT_M_COST),
            iterations: env_parse("ARGON2_ITERATIONS", argon2::Params::DEFAULT_T_COST),
            parallelism: env_parse("ARGON2_PARALLELISM", argon2::Params::DEFAULT_P_COST),
        };
        let reset = ResetConfig {
            ttl_minutes: env_parse("RESET_TOKEN_TTL_MINUTES", 15),
            link_base: std::env::var("RESET_LINK_BASE")
                .unwrap_or_else(|_| "http://localhost:3000/reset-password.html".into()),
        };
        let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_ORIGINS.into())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT", 8080),
            database_url,
            jwt,
            password,
            reset,
            allowed_origins,
        })
    }

    /// Cheap hashing parameters and a fixed secret, for tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                ttl_minutes: 12 * 60,
            },
            password: PasswordConfig {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
            reset: ResetConfig {
                ttl_minutes: 15,
                link_base: "http://localhost:3000/reset-password.html".into(),
            },
            allowed_origins: vec!["http://localhost:3000".into()],
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
