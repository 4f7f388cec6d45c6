//! Integration tests for TOML configuration loading.
//!
//! Uses `figment::Jail` for sandboxed files and env vars.

use std::path::PathBuf;

use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;
use tether_config::TetherConfig;

#[test]
fn loads_all_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
data_dir = "/srv/sqlite"
foreign_keys = false

[audit]
check_timeout_secs = 5
audit_timeout_secs = 20
max_concurrency = 2

[server]
bind = "0.0.0.0:8080"
allowed_origin = "https://audit.example.com"
workers = 2
"#,
        )?;

        let config: TetherConfig = Figment::from(Serialized::defaults(TetherConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.data_dir, PathBuf::from("/srv/sqlite"));
        assert!(!config.database.foreign_keys);
        assert_eq!(config.audit.check_timeout_secs, 5);
        assert_eq!(config.audit.audit_timeout_secs, 20);
        assert_eq!(config.audit.max_concurrency, 2);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.server.allowed_origin, "https://audit.example.com");
        assert_eq!(config.server.workers, 2);
        Ok(())
    });
}

#[test]
fn partial_toml_keeps_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[audit]
max_concurrency = 3
"#,
        )?;

        let config: TetherConfig = Figment::from(Serialized::defaults(TetherConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.audit.max_concurrency, 3);
        assert_eq!(config.audit.check_timeout_secs, 30);
        assert_eq!(config.database.data_dir, PathBuf::from("databases"));
        Ok(())
    });
}

#[test]
fn env_overrides_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
data_dir = "from-toml"
"#,
        )?;
        jail.set_env("TETHER_DATABASE__DATA_DIR", "from-env");
        jail.set_env("TETHER_AUDIT__CHECK_TIMEOUT_SECS", "9");

        let config: TetherConfig = Figment::from(Serialized::defaults(TetherConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("TETHER_").split("__"))
            .extract()?;

        assert_eq!(config.database.data_dir, PathBuf::from("from-env"));
        assert_eq!(config.audit.check_timeout_secs, 9);
        Ok(())
    });
}

#[test]
fn project_local_file_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_dir(".tether")?;
        jail.create_file(
            ".tether/config.toml",
            r#"
[server]
bind = "127.0.0.1:7070"
"#,
        )?;

        let config = TetherConfig::load().expect("config loads");
        assert_eq!(config.server.bind, "127.0.0.1:7070");
        Ok(())
    });
}

#[test]
fn load_rejects_invalid_values() {
    Jail::expect_with(|jail| {
        jail.set_env("TETHER_AUDIT__MAX_CONCURRENCY", "0");
        let err = TetherConfig::load().unwrap_err();
        assert!(err.to_string().contains("audit.max_concurrency"));
        Ok(())
    });
}
