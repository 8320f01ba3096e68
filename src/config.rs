/*
 * Responsibility
 * - Load settings from the environment (.env supported via dotenvy)
 * - Validate them up front: missing/invalid values abort startup
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::{env, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Upper bound for any `*_SECONDS` setting (100 years).
pub const MAX_DURATION_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// A development user created at startup (`DEV_USERS=name:email:password[:role|role],...`).
#[derive(Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub roles: Vec<String>,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // Bearer tokens
    pub auth_issuer: String,
    pub auth_audience: String,
    pub auth_signing_key: String,
    pub token_lifetime_seconds: u64,
    pub clock_skew_seconds: u64,

    // Cookie sessions
    pub session_encryption_key: String,
    pub session_sliding_window_seconds: u64,
    pub session_absolute_lifetime_seconds: u64,
    pub session_cookie_name: String,
    pub session_cookie_secure: bool,
    pub login_path: String,

    pub seed_users: Vec<SeedUser>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("auth_issuer", &self.auth_issuer)
            .field("auth_audience", &self.auth_audience)
            .field("token_lifetime_seconds", &self.token_lifetime_seconds)
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .field(
                "session_sliding_window_seconds",
                &self.session_sliding_window_seconds,
            )
            .field(
                "session_absolute_lifetime_seconds",
                &self.session_absolute_lifetime_seconds,
            )
            .field("session_cookie_name", &self.session_cookie_name)
            .field("session_cookie_secure", &self.session_cookie_secure)
            .field("login_path", &self.login_path)
            .field("seed_users", &self.seed_users)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let auth_issuer = required(&lookup, "AUTH_ISSUER")?;
        let auth_audience = required(&lookup, "AUTH_AUDIENCE")?;
        let auth_signing_key = required(&lookup, "AUTH_SIGNING_KEY")?;

        let token_lifetime_seconds = seconds(&lookup, "AUTH_TOKEN_LIFETIME_SECONDS", 7_776_000)?; // ~3 months
        let clock_skew_seconds = seconds(&lookup, "AUTH_CLOCK_SKEW_SECONDS", 60)?;

        let session_encryption_key = required(&lookup, "SESSION_ENCRYPTION_KEY")?;
        let session_sliding_window_seconds =
            seconds(&lookup, "SESSION_SLIDING_WINDOW_SECONDS", 15)?;
        let session_absolute_lifetime_seconds =
            seconds(&lookup, "SESSION_ABSOLUTE_LIFETIME_SECONDS", 1_209_600)?; // 14 days

        let session_cookie_name =
            lookup("SESSION_COOKIE_NAME").unwrap_or_else(|| "auth_session".to_string());
        let session_cookie_secure = match lookup("SESSION_COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid("SESSION_COOKIE_SECURE"))?,
            None => app_env.is_production(),
        };

        let login_path = lookup("LOGIN_PATH").unwrap_or_else(|| "/login".to_string());
        if !login_path.starts_with('/') {
            return Err(ConfigError::Invalid("LOGIN_PATH"));
        }

        let seed_users = match lookup("DEV_USERS") {
            Some(raw) => parse_seed_users(&raw).ok_or(ConfigError::Invalid("DEV_USERS"))?,
            None => Vec::new(),
        };

        Ok(Self {
            addr,
            app_env,
            auth_issuer,
            auth_audience,
            auth_signing_key,
            token_lifetime_seconds,
            clock_skew_seconds,
            session_encryption_key,
            session_sliding_window_seconds,
            session_absolute_lifetime_seconds,
            session_cookie_name,
            session_cookie_secure,
            login_path,
            seed_users,
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or(ConfigError::Missing(key))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(key));
    }
    Ok(value)
}

fn seconds<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(n) if (1..=MAX_DURATION_SECONDS).contains(&n) => Ok(n),
            _ => Err(ConfigError::Invalid(key)),
        },
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_seed_users(raw: &str) -> Option<Vec<SeedUser>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let mut fields = entry.splitn(4, ':');
            let username = fields.next()?.trim();
            let email = fields.next()?.trim();
            let password = fields.next()?;
            if username.is_empty() || email.is_empty() || password.is_empty() {
                return None;
            }
            let roles = fields
                .next()
                .map(|r| {
                    r.split('|')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Some(SeedUser {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                roles,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, String> {
        HashMap::from([
            ("AUTH_ISSUER", "app".to_string()),
            ("AUTH_AUDIENCE", "clients".to_string()),
            ("AUTH_SIGNING_KEY", "secret".to_string()),
            ("SESSION_ENCRYPTION_KEY", "a".repeat(64)),
        ])
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = load(&base()).unwrap();
        assert_eq!(cfg.addr.port(), 3000);
        assert_eq!(cfg.app_env, AppEnv::Development);
        assert_eq!(cfg.token_lifetime_seconds, 7_776_000);
        assert_eq!(cfg.session_sliding_window_seconds, 15);
        assert_eq!(cfg.login_path, "/login");
        assert!(!cfg.session_cookie_secure);
        assert!(cfg.seed_users.is_empty());
    }

    #[test]
    fn missing_signing_key_fails() {
        let mut vars = base();
        vars.remove("AUTH_SIGNING_KEY");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("AUTH_SIGNING_KEY"));
    }

    #[test]
    fn empty_signing_key_fails() {
        let mut vars = base();
        vars.insert("AUTH_SIGNING_KEY", "  ".to_string());
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Invalid("AUTH_SIGNING_KEY"));
    }

    #[test]
    fn zero_duration_is_invalid() {
        let mut vars = base();
        vars.insert("SESSION_SLIDING_WINDOW_SECONDS", "0".to_string());
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Invalid("SESSION_SLIDING_WINDOW_SECONDS")
        );
    }

    #[test]
    fn out_of_range_duration_is_invalid() {
        let mut vars = base();
        vars.insert("AUTH_TOKEN_LIFETIME_SECONDS", "10000000000000".to_string());
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Invalid("AUTH_TOKEN_LIFETIME_SECONDS")
        );

        let mut vars = base();
        vars.insert("SESSION_ABSOLUTE_LIFETIME_SECONDS", "99999999999999999".to_string());
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Invalid("SESSION_ABSOLUTE_LIFETIME_SECONDS")
        );

        let mut vars = base();
        vars.insert(
            "AUTH_CLOCK_SKEW_SECONDS",
            MAX_DURATION_SECONDS.to_string(),
        );
        assert!(load(&vars).is_ok());
    }

    #[test]
    fn production_defaults_to_secure_cookie() {
        let mut vars = base();
        vars.insert("APP_ENV", "prod".to_string());
        assert!(load(&vars).unwrap().session_cookie_secure);
    }

    #[test]
    fn seed_users_are_parsed() {
        let mut vars = base();
        vars.insert(
            "DEV_USERS",
            "uponia:adam@example.com:password:admin|player, bob:bob@example.com:pw".to_string(),
        );
        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.seed_users.len(), 2);
        assert_eq!(cfg.seed_users[0].roles, ["admin", "player"]);
        assert!(cfg.seed_users[1].roles.is_empty());

        vars.insert("DEV_USERS", "broken-entry".to_string());
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Invalid("DEV_USERS"));
    }

    #[test]
    fn debug_hides_secrets() {
        let cfg = load(&base()).unwrap();
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("secret"));
        assert!(!printed.contains(&"a".repeat(64)));
    }
}
