//! Tests for config module.

use super::*;
use crate::domain::InvoiceRule;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

// ==================== Duration parsing tests ====================

#[test]
fn test_parse_duration_seconds() {
    let d = duration::parse_duration("30s").unwrap();
    assert_eq!(d, Duration::from_secs(30));
}

#[test]
fn test_parse_duration_minutes() {
    let d = duration::parse_duration("2m").unwrap();
    assert_eq!(d, Duration::from_secs(120));
}

#[test]
fn test_parse_duration_milliseconds() {
    let d = duration::parse_duration("250ms").unwrap();
    assert_eq!(d, Duration::from_millis(250));
}

#[test]
fn test_parse_duration_bare_number_is_seconds() {
    let d = duration::parse_duration("7").unwrap();
    assert_eq!(d, Duration::from_secs(7));
}

#[test]
fn test_parse_duration_empty() {
    let d = duration::parse_duration("").unwrap();
    assert_eq!(d, Duration::ZERO);
}

#[test]
fn test_parse_duration_invalid_unit() {
    let result = duration::parse_duration("10x");
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("unknown duration unit"));
}

#[test]
fn test_parse_duration_minutes_out_of_range() {
    let result = duration::parse_duration("18446744073709551615m");
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("out of range"));
}

// ==================== YAML field loading tests ====================

/// Parse config from YAML string (for testing).
fn from_yaml(yaml: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml::from_str(yaml)?;
    Ok(config)
}

fn minimal_valid_yaml() -> String {
    r#"
app:
  name: backoffice
  env: development

storage:
  path: backoffice.db
"#
    .to_string()
}

#[test]
fn test_load_app_fields() {
    let yaml = r#"
app:
  name: shop
  env: production
  log_level: debug

storage:
  path: shop.db
"#;
    let cfg = from_yaml(yaml).unwrap();

    assert_eq!(cfg.app.name, "shop");
    assert_eq!(cfg.app.env, "production");
    assert_eq!(cfg.app.log_level, Some("debug".to_string()));
}

#[test]
fn test_load_storage_fields() {
    let yaml = r#"
app:
  name: shop
  env: dev

storage:
  path: "data/shop.db"
  max_connections: 8
  busy_timeout: 5s
"#;
    let cfg = from_yaml(yaml).unwrap();

    assert_eq!(cfg.storage.path, "data/shop.db");
    assert_eq!(cfg.storage.max_connections, Some(8));
    assert_eq!(cfg.storage.busy_timeout, Duration::from_secs(5));
}

#[test]
fn test_policy_defaults_when_section_missing() {
    let cfg = from_yaml(&minimal_valid_yaml()).unwrap();

    assert!(cfg.policy.require_paid_before_ship);
    assert_eq!(cfg.policy.invoice_rule, InvoiceRule::DeliveredOrPaid);
    assert_eq!(cfg.policy.order_number_prefix, "ORD");
}

#[test]
fn test_load_policy_fields() {
    let yaml = r#"
app:
  name: shop
  env: dev

storage:
  path: shop.db

policy:
  require_paid_before_ship: false
  invoice_rule: fully_paid
  order_number_prefix: INV
"#;
    let cfg = from_yaml(yaml).unwrap();

    assert!(!cfg.policy.require_paid_before_ship);
    assert_eq!(cfg.policy.invoice_rule, InvoiceRule::FullyPaid);
    assert_eq!(cfg.policy.order_number_prefix, "INV");
}

#[test]
fn test_unknown_invoice_rule_fails_to_parse() {
    let yaml = r#"
app:
  name: shop
  env: dev

storage:
  path: shop.db

policy:
  invoice_rule: whenever
"#;
    assert!(matches!(from_yaml(yaml), Err(ConfigError::Parse(_))));
}

// ==================== Validation tests ====================

#[test]
fn test_validate_empty_app_name() {
    let yaml = r#"
app:
  name: ""
  env: dev

storage:
  path: shop.db
"#;
    let cfg = from_yaml(yaml).unwrap();

    let result = cfg.validate();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("app.name is required"));
}

#[test]
fn test_validate_empty_storage_path() {
    let yaml = r#"
app:
  name: shop
  env: dev

storage:
  path: "  "
"#;
    let cfg = from_yaml(yaml).unwrap();

    let result = cfg.validate();
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("storage.path is required"));
}

#[test]
fn test_validate_zero_max_connections() {
    let yaml = r#"
app:
  name: shop
  env: dev

storage:
  path: shop.db
  max_connections: 0
"#;
    let cfg = from_yaml(yaml).unwrap();

    let result = cfg.validate();
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("max_connections must be positive"));
}

#[test]
fn test_validate_bad_order_prefix() {
    let yaml = r#"
app:
  name: shop
  env: dev

storage:
  path: shop.db

policy:
  order_number_prefix: "OR-D"
"#;
    let cfg = from_yaml(yaml).unwrap();

    let result = cfg.validate();
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("order_number_prefix"));
}

// ==================== File loading tests ====================

#[test]
fn test_load_from_file() {
    let yaml = minimal_valid_yaml();

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let cfg = Config::load(file.path().to_str().unwrap()).unwrap();

    assert_eq!(cfg.app.name, "backoffice");
    assert_eq!(cfg.app.env, "development");
    assert_eq!(cfg.storage.busy_timeout, Duration::ZERO);
}

#[test]
fn test_env_override_replaces_db_path() {
    let mut cfg = from_yaml(&minimal_valid_yaml()).unwrap();

    // Set env var (unsafe because modifying env is not thread-safe)
    unsafe {
        env::set_var(DB_PATH_ENV, "/var/lib/backoffice/prod.db");
    }

    cfg.apply_env_overrides();
    assert_eq!(cfg.storage.path, "/var/lib/backoffice/prod.db");

    unsafe {
        env::remove_var(DB_PATH_ENV);
    }
}

#[test]
fn test_load_file_not_found() {
    let result = Config::load("nonexistent_config.yaml");
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("failed to read config file"));
}
