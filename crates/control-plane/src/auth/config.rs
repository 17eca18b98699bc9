// Authentication configuration loaded from environment variables.
// Decision: Default to "none" mode so a local deployment accepts anonymous submissions
// Decision: JWT_SECRET falls back to a random per-process secret

use std::time::Duration;

/// Authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Expression endpoints are open; records have no owner
    #[default]
    None,
    /// Expression endpoints require a bearer token; records are scoped to the caller
    Full,
}

impl AuthMode {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "full" => AuthMode::Full,
            _ => AuthMode::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Full => "full",
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret for signing tokens
    pub secret: String,
    /// Token lifetime
    pub token_lifetime: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_lifetime: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub jwt: JwtConfig,
}

impl AuthConfig {
    /// Load configuration from environment variables
    ///
    /// - `AUTH_MODE`: `none` (default) or `full`
    /// - `JWT_SECRET`: signing secret
    /// - `TOKEN_LIFETIME_SECS`: token lifetime (default 86400)
    pub fn from_env() -> Self {
        let mode = std::env::var("AUTH_MODE")
            .map(|s| AuthMode::parse(&s))
            .unwrap_or_default();

        let secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                if mode == AuthMode::Full {
                    tracing::warn!(
                        "JWT_SECRET not set, using a random secret; tokens will not survive a restart"
                    );
                }
                random_secret()
            });

        let token_lifetime = std::env::var("TOKEN_LIFETIME_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| JwtConfig::default().token_lifetime);

        Self {
            mode,
            jwt: JwtConfig {
                secret,
                token_lifetime,
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != AuthMode::None
    }

    /// Config for tests and dev tooling with a fixed secret
    pub fn with_secret(mode: AuthMode, secret: impl Into<String>) -> Self {
        Self {
            mode,
            jwt: JwtConfig {
                secret: secret.into(),
                ..JwtConfig::default()
            },
        }
    }
}

fn random_secret() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}
