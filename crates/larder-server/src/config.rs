use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub admin_password: String,
    pub user_password: String,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            database_url: "larder.db".to_string(),
            admin_password: "admin123".to_string(),
            user_password: "user123".to_string(),
            session_secret: "larder-dev-session-secret".to_string(),
            session_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            max_body_bytes: 16 * 1024,
        }
    }
}

pub fn validate_startup_config_contract(config: &ServerConfig) -> Result<(), String> {
    if config.bind_addr.parse::<std::net::SocketAddr>().is_err() {
        return Err(format!("invalid bind address: {}", config.bind_addr));
    }
    if config.admin_password.is_empty() || config.user_password.is_empty() {
        return Err("role passwords must not be empty".to_string());
    }
    if config.admin_password == config.user_password {
        return Err("admin and user passwords must differ".to_string());
    }
    if config.session_secret.is_empty() {
        return Err("session secret must not be empty".to_string());
    }
    if config.session_ttl.is_zero() {
        return Err("session ttl must be > 0".to_string());
    }
    if config.max_body_bytes == 0 {
        return Err("max body bytes must be > 0".to_string());
    }
    database_path_from_url(&config.database_url)?;
    Ok(())
}

/// Resolves the configured database url to an on-disk SQLite path.
///
/// Accepts `sqlite://relative.db`, `sqlite:///relative.db`,
/// `sqlite:////absolute/path.db`, or a bare file path. Any other scheme
/// aborts startup.
pub fn database_path_from_url(url: &str) -> Result<PathBuf, String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err("database url must not be empty".to_string());
    }
    let path = if let Some(rest) = trimmed.strip_prefix("sqlite://") {
        rest.strip_prefix('/').unwrap_or(rest)
    } else if trimmed.contains("://") {
        return Err(format!(
            "unsupported database url scheme in {trimmed}; use sqlite://path or a bare file path"
        ));
    } else {
        trimmed
    };
    if path.is_empty() {
        return Err("database url must name a file path".to_string());
    }
    if path == ":memory:" {
        return Err("in-memory databases are not supported".to_string());
    }
    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_config_validation_rejects_shared_passwords() {
        let config = ServerConfig {
            admin_password: "same".to_string(),
            user_password: "same".to_string(),
            ..ServerConfig::default()
        };
        let err = validate_startup_config_contract(&config).expect_err("shared passwords");
        assert!(err.contains("must differ"));
    }

    #[test]
    fn startup_config_validation_rejects_empty_secrets_and_zero_ttl() {
        let config = ServerConfig {
            session_secret: String::new(),
            ..ServerConfig::default()
        };
        let err = validate_startup_config_contract(&config).expect_err("empty secret");
        assert!(err.contains("session secret"));

        let config = ServerConfig {
            session_ttl: Duration::ZERO,
            ..ServerConfig::default()
        };
        let err = validate_startup_config_contract(&config).expect_err("zero ttl");
        assert!(err.contains("session ttl"));
    }

    #[test]
    fn startup_config_validation_rejects_unparseable_bind_addr() {
        let config = ServerConfig {
            bind_addr: "not-an-addr".to_string(),
            ..ServerConfig::default()
        };
        let err = validate_startup_config_contract(&config).expect_err("bad bind");
        assert!(err.contains("bind address"));
    }

    #[test]
    fn database_url_resolution_handles_sqlite_forms() {
        assert_eq!(
            database_path_from_url("larder.db").expect("bare path"),
            PathBuf::from("larder.db")
        );
        assert_eq!(
            database_path_from_url("sqlite://larder.db").expect("two slashes"),
            PathBuf::from("larder.db")
        );
        assert_eq!(
            database_path_from_url("sqlite:///larder.db").expect("three slashes"),
            PathBuf::from("larder.db")
        );
        assert_eq!(
            database_path_from_url("sqlite:////var/lib/larder.db").expect("absolute"),
            PathBuf::from("/var/lib/larder.db")
        );
    }

    #[test]
    fn database_url_resolution_rejects_foreign_schemes_and_memory() {
        let err = database_path_from_url("postgres://db/larder").expect_err("foreign scheme");
        assert!(err.contains("unsupported database url scheme"));
        let err = database_path_from_url("sqlite://:memory:").expect_err("memory");
        assert!(err.contains("in-memory"));
        let err = database_path_from_url("   ").expect_err("blank");
        assert!(err.contains("must not be empty"));
    }
}
