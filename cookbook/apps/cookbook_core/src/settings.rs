use std::{
    env,
    fmt::Display,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    str::FromStr,
};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("{key} is not valid unicode")]
    NotUnicode { key: &'static str },
}

/// Argon2id cost parameters used when hashing new passwords.
#[derive(Clone, Debug)]
pub struct PasswordCfg {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordCfg {
    fn default() -> Self {
        Self {
            memory_kib: 19_456, // ~19MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Directory uploaded files are written under.
    pub media_root: PathBuf,
    /// Public prefix stored paths are exposed under. Always ends with `/`.
    pub media_url: String,
    pub max_upload_bytes: usize,
    pub password: PasswordCfg,
    pub log_sql: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://cookbook.sqlite3?mode=rwc".into(),
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8000),
            media_root: PathBuf::from("media"),
            media_url: "/media/".into(),
            max_upload_bytes: 10 * 1024 * 1024,
            password: PasswordCfg::default(),
            log_sql: false,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// Unset variables fall back to [`Settings::default`]. A variable that is
    /// set but does not parse is an error, never a silent fallback.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&'static str) -> Result<String, env::VarError>,
    {
        let d = Self::default();
        let get = |key: &'static str| -> Result<Option<String>, SettingsError> {
            match lookup(key) {
                Ok(v) => Ok(Some(v)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(env::VarError::NotUnicode(_)) => Err(SettingsError::NotUnicode { key }),
            }
        };

        let host: IpAddr = parse_or(get("HOST")?, "HOST", d.bind_addr.ip())?;
        let port: u16 = parse_or(get("PORT")?, "PORT", d.bind_addr.port())?;

        let media_url = match get("MEDIA_URL")? {
            None => d.media_url,
            Some(v) => media_prefix(&v)?,
        };

        let settings = Self {
            database_url: get("DATABASE_URL")?.unwrap_or(d.database_url),
            bind_addr: SocketAddr::new(host, port),
            media_root: get("MEDIA_ROOT")?.map(PathBuf::from).unwrap_or(d.media_root),
            media_url,
            max_upload_bytes: parse_or(get("MAX_UPLOAD_BYTES")?, "MAX_UPLOAD_BYTES", d.max_upload_bytes)?,
            password: PasswordCfg {
                memory_kib: parse_or(get("ARGON2_MEMORY_KIB")?, "ARGON2_MEMORY_KIB", d.password.memory_kib)?,
                iterations: parse_or(get("ARGON2_ITERATIONS")?, "ARGON2_ITERATIONS", d.password.iterations)?,
                parallelism: parse_or(get("ARGON2_PARALLELISM")?, "ARGON2_PARALLELISM", d.password.parallelism)?,
            },
            log_sql: match get("DB_LOG_SQL")? {
                None => d.log_sql,
                Some(v) => parse_flag(&v).ok_or(SettingsError::Invalid {
                    key: "DB_LOG_SQL",
                    reason: format!("expected a boolean, got {v:?}"),
                })?,
            },
        };

        info!(
            bind = %settings.bind_addr,
            media_root = %settings.media_root.display(),
            "settings loaded"
        );
        Ok(settings)
    }

    /// Public URL for a path relative to the media root.
    pub fn media_url_for(&self, relative: &str) -> String {
        format!("{}{}", self.media_url, relative.trim_start_matches('/'))
    }
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| SettingsError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

/// `MEDIA_URL` is mounted as a route, so it must be a local path with at
/// least one segment. Normalised to `/segment/.../`.
fn media_prefix(raw: &str) -> Result<String, SettingsError> {
    let invalid = |reason: &str| SettingsError::Invalid {
        key: "MEDIA_URL",
        reason: format!("{reason}, got {raw:?}"),
    };
    let raw = raw.trim();
    if !raw.starts_with('/') || raw.starts_with("//") {
        return Err(invalid("expected a path starting with a single /"));
    }
    let inner = raw.trim_matches('/');
    if inner.is_empty() {
        return Err(invalid("expected at least one path segment"));
    }
    if inner
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == ".." || seg.contains(['?', '#', '{', '}']))
    {
        return Err(invalid("expected plain path segments"));
    }
    Ok(format!("/{inner}/"))
}

/// Parses the usual spellings of a boolean flag.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "True" | "yes" => Some(true),
        "0" | "false" | "FALSE" | "False" | "no" => Some(false),
        _ => None,
    }
}
