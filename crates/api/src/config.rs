//! Server configuration loaded from environment variables.

/// Default access-token lifetime in seconds (15 minutes).
const DEFAULT_ACCESS_TTL_SECS: i64 = 900;
/// Default clock-skew tolerance for token validation, in seconds.
const DEFAULT_CLOCK_SKEW_SECS: i64 = 30;
/// Default refresh-token lifetime in days.
const DEFAULT_REFRESH_TTL_DAYS: i64 = 30;
/// Default minimum password length.
const DEFAULT_PASSWORD_MIN_LENGTH: usize = 6;
/// Default interval between WebSocket pings, in seconds.
const DEFAULT_PING_INTERVAL_SECS: u64 = 15;
/// Default "online" window for the detailed roster, in seconds.
const DEFAULT_ONLINE_WINDOW_SECS: u64 = 60;
/// Default interval between expired-session sweeps, in seconds.
const DEFAULT_SESSION_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Top-level server configuration.
///
/// All fields except the JWT key paths have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Grace allowed to in-flight work after a shutdown signal before
    /// remaining connections are force-closed (default: `10`).
    pub shutdown_grace_secs: u64,
    /// Credential configuration (keys, TTLs, password policy).
    pub auth: AuthConfig,
    /// Rooms / WebSocket configuration.
    pub rooms: RoomsConfig,
}

/// Credential-core configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
    /// Minimum accepted password length (default: `6`).
    pub password_min_length: usize,
    /// Refresh-token lifetime in days (default: `30`).
    pub refresh_ttl_days: i64,
    /// Interval between expired-session sweeps in seconds (default: `3600`).
    pub session_sweep_interval_secs: u64,
}

/// RS256 signing configuration.
///
/// Key material is loaded into memory once at startup; the paths are not
/// re-read afterwards.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// PEM-encoded RSA private key (signing).
    pub private_key_pem: String,
    /// PEM-encoded RSA public key (verification).
    pub public_key_pem: String,
    /// `iss` claim, required to match on validation.
    pub issuer: String,
    /// `aud` claim, required to match on validation.
    pub audience: String,
    /// Access-token lifetime in seconds (default: `900`).
    pub access_ttl_secs: i64,
    /// Validation leeway for `exp`/`nbf`, in seconds (default: `30`).
    pub clock_skew_secs: i64,
}

/// Rooms-engine configuration.
#[derive(Debug, Clone)]
pub struct RoomsConfig {
    /// Interval between WebSocket pings in seconds (default: `15`).
    /// The per-session read deadline is twice this.
    pub ping_interval_secs: u64,
    /// Roster "online" window in seconds (default: `60`).
    pub online_window_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Required | Default                 |
    /// |-------------------------------|----------|-------------------------|
    /// | `HOST`                        | no       | `0.0.0.0`               |
    /// | `PORT`                        | no       | `3000`                  |
    /// | `CORS_ORIGINS`                | no       | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | no       | `30`                    |
    /// | `SHUTDOWN_GRACE_SECS`         | no       | `10`                    |
    /// | `JWT_PRIVATE_KEY_PATH`        | **yes**  | --                      |
    /// | `JWT_PUBLIC_KEY_PATH`         | **yes**  | --                      |
    /// | `JWT_ISSUER`                  | no       | `huddle-auth`           |
    /// | `JWT_AUDIENCE`                | no       | `huddle`                |
    /// | `JWT_ACCESS_TTL_SECS`         | no       | `900`                   |
    /// | `JWT_CLOCK_SKEW_SECS`         | no       | `30`                    |
    /// | `REFRESH_TTL_DAYS`            | no       | `30`                    |
    /// | `PASSWORD_MIN_LENGTH`         | no       | `6`                     |
    /// | `SESSION_SWEEP_INTERVAL_SECS` | no       | `3600`                  |
    /// | `WS_PING_INTERVAL_SECS`       | no       | `15`                    |
    /// | `ONLINE_WINDOW_SECS`          | no       | `60`                    |
    ///
    /// # Panics
    ///
    /// Panics on missing key paths, unreadable key files, or malformed
    /// numeric values -- misconfiguration should fail fast at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_or("PORT", "3000");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30");
        let shutdown_grace_secs: u64 = env_or("SHUTDOWN_GRACE_SECS", "10");

        let private_key_path = std::env::var("JWT_PRIVATE_KEY_PATH")
            .expect("JWT_PRIVATE_KEY_PATH must be set in the environment");
        let public_key_path = std::env::var("JWT_PUBLIC_KEY_PATH")
            .expect("JWT_PUBLIC_KEY_PATH must be set in the environment");
        let private_key_pem = std::fs::read_to_string(&private_key_path)
            .unwrap_or_else(|e| panic!("Failed to read {private_key_path}: {e}"));
        let public_key_pem = std::fs::read_to_string(&public_key_path)
            .unwrap_or_else(|e| panic!("Failed to read {public_key_path}: {e}"));

        let jwt = JwtConfig {
            private_key_pem,
            public_key_pem,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "huddle-auth".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "huddle".into()),
            access_ttl_secs: env_or("JWT_ACCESS_TTL_SECS", "900"),
            clock_skew_secs: env_or("JWT_CLOCK_SKEW_SECS", "30"),
        };
        assert!(jwt.access_ttl_secs > 0, "JWT_ACCESS_TTL_SECS must be > 0");
        assert!(
            (0..=60).contains(&jwt.clock_skew_secs),
            "JWT_CLOCK_SKEW_SECS must be in [0..60]"
        );

        let auth = AuthConfig {
            jwt,
            password_min_length: env_or("PASSWORD_MIN_LENGTH", "6"),
            refresh_ttl_days: env_or("REFRESH_TTL_DAYS", "30"),
            session_sweep_interval_secs: env_or("SESSION_SWEEP_INTERVAL_SECS", "3600"),
        };

        let rooms = RoomsConfig {
            ping_interval_secs: env_or("WS_PING_INTERVAL_SECS", "15"),
            online_window_secs: env_or("ONLINE_WINDOW_SECS", "60"),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_grace_secs,
            auth,
            rooms,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt: JwtConfig::default(),
            password_min_length: DEFAULT_PASSWORD_MIN_LENGTH,
            refresh_ttl_days: DEFAULT_REFRESH_TTL_DAYS,
            session_sweep_interval_secs: DEFAULT_SESSION_SWEEP_INTERVAL_SECS,
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            private_key_pem: String::new(),
            public_key_pem: String::new(),
            issuer: "huddle-auth".into(),
            audience: "huddle".into(),
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
        }
    }
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: DEFAULT_PING_INTERVAL_SECS,
            online_window_secs: DEFAULT_ONLINE_WINDOW_SECS,
        }
    }
}

/// Parse an env var or fall back to the given default.
///
/// # Panics
///
/// Panics when the variable is set but does not parse.
fn env_or<T: std::str::FromStr>(key: &str, default: &str) -> T
where
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.into());
    raw.parse()
        .unwrap_or_else(|e| panic!("{key} must be a valid value: {e}"))
}
