/// Configuration management for the API server
///
/// Loads configuration from environment variables (and a `.env` file when
/// present) into a type-safe struct.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8080)
/// - `CORS_ORIGINS`: comma separated origins, `*` for any (default: `*`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset means in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `STORE_ID`: id of an existing store
/// - `AUTO_SETUP`: run store setup at startup (default: true)
/// - `ADMIN_TOKEN`: guards the admin routes (required, at least 16 characters)
/// - `PROVIDER_BASE_URL`: REST document provider; unset means in-memory provider
/// - `PROVIDER_TOKEN`: bearer token for the provider
/// - `PROVIDER_PUBLIC_URL_TEMPLATE`: public URL with an `{id}` placeholder
/// - `PROVIDER_TIMEOUT_SECONDS`: provider request timeout (default: 30)
/// - `ARGON2_MEMORY_KIB` / `ARGON2_ITERATIONS` / `ARGON2_PARALLELISM`: hashing cost
/// - `RUST_LOG`: log filter
///
/// # Example
///
/// ```no_run
/// use formdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use formdesk_core::config::{PasswordParams, ServiceConfig};
use formdesk_core::provider::http::{HttpProviderConfig, DEFAULT_PUBLIC_URL_TEMPLATE};
use serde::{Deserialize, Serialize};
use std::env;

/// Minimum length of the admin token
pub const MIN_ADMIN_TOKEN_LENGTH: usize = 16;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration, None for the in-memory store
    pub database: Option<DatabaseConfig>,

    /// Store selection and setup
    pub store: StoreConfig,

    /// Admin route protection
    pub admin: AdminConfig,

    /// Document provider, None for the in-memory provider
    pub provider: Option<ProviderConfig>,

    /// Argon2id cost parameters
    pub password: PasswordParams,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Existing store to reuse
    pub store_id: Option<String>,

    /// Whether to run setup at startup
    pub auto_setup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer token accepted on admin routes
    ///
    /// Generate with: `openssl rand -hex 24`
    pub token: String,
}

/// REST document provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub public_url_template: String,
    pub timeout_seconds: u64,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `ADMIN_TOKEN` is missing or too short
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;
        let cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));

        let database = match non_empty_var("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse::<u32>()?,
            }),
            None => None,
        };

        let auto_setup = env::var("AUTO_SETUP")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .map_err(|_| anyhow::anyhow!("AUTO_SETUP must be true or false"))?;

        let admin_token = env::var("ADMIN_TOKEN")
            .map_err(|_| anyhow::anyhow!("ADMIN_TOKEN environment variable is required"))?;

        let provider = match non_empty_var("PROVIDER_BASE_URL") {
            Some(base_url) => Some(ProviderConfig {
                base_url,
                token: non_empty_var("PROVIDER_TOKEN"),
                public_url_template: env::var("PROVIDER_PUBLIC_URL_TEMPLATE")
                    .unwrap_or_else(|_| DEFAULT_PUBLIC_URL_TEMPLATE.to_string()),
                timeout_seconds: env::var("PROVIDER_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse::<u64>()?,
            }),
            None => None,
        };

        let defaults = PasswordParams::default();
        let password = PasswordParams {
            memory_kib: match env::var("ARGON2_MEMORY_KIB") {
                Ok(value) => value.parse::<u32>()?,
                Err(_) => defaults.memory_kib,
            },
            iterations: match env::var("ARGON2_ITERATIONS") {
                Ok(value) => value.parse::<u32>()?,
                Err(_) => defaults.iterations,
            },
            parallelism: match env::var("ARGON2_PARALLELISM") {
                Ok(value) => value.parse::<u32>()?,
                Err(_) => defaults.parallelism,
            },
        };

        let config = Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
            },
            database,
            store: StoreConfig {
                store_id: non_empty_var("STORE_ID"),
                auto_setup,
            },
            admin: AdminConfig { token: admin_token },
            provider,
            password,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants that do not depend on the environment
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.admin.token.len() < MIN_ADMIN_TOKEN_LENGTH {
            anyhow::bail!(
                "ADMIN_TOKEN must be at least {} characters long",
                MIN_ADMIN_TOKEN_LENGTH
            );
        }
        if self.api.cors_origins.is_empty() {
            anyhow::bail!("CORS_ORIGINS must name at least one origin");
        }
        if let Some(provider) = &self.provider {
            if !provider.public_url_template.contains("{id}") {
                anyhow::bail!("PROVIDER_PUBLIC_URL_TEMPLATE must contain {{id}}");
            }
        }
        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Core service configuration derived from this one
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            store_id: self.store.store_id.clone(),
            password: self.password,
            ..Default::default()
        }
    }

    /// REST provider configuration, if a provider is configured
    pub fn provider_config(&self) -> Option<HttpProviderConfig> {
        self.provider.as_ref().map(|provider| HttpProviderConfig {
            base_url: provider.base_url.clone(),
            token: provider.token.clone(),
            public_url_template: provider.public_url_template.clone(),
            timeout_seconds: provider.timeout_seconds,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
            },
            database: None,
            store: StoreConfig {
                store_id: Some("store-1".to_string()),
                auto_setup: true,
            },
            admin: AdminConfig {
                token: "admin-token-0123456789".to_string(),
            },
            provider: None,
            password: PasswordParams::fast(),
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" https://a.example.com, ,https://b.example.com "),
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert_eq!(parse_origins("*"), vec!["*"]);
    }

    #[test]
    fn test_short_admin_token_rejected() {
        let mut config = test_config();
        assert!(config.validate().is_ok());

        config.admin.token = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_template_needs_placeholder() {
        let mut config = test_config();
        config.provider = Some(ProviderConfig {
            base_url: "https://api.example.com".to_string(),
            token: None,
            public_url_template: "https://example.com/forms".to_string(),
            timeout_seconds: 5,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_service_config() {
        let service = test_config().service_config();
        assert_eq!(service.store_id.as_deref(), Some("store-1"));
        assert_eq!(service.password, PasswordParams::fast());
        assert!(service.max_commit_attempts > 0);
    }
}
