use care_engine::config::{BackoffCurve, ConfigError, ConfigLoader, PharmacyEnvironment};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const CARE_VARS: &[&str] = &[
    "CARE_PROFILE",
    "CARE_API_BIND_ADDR",
    "CARE_LOG_LEVEL",
    "CARE_LOG_FORMAT",
    "CARE_OPERATOR_TOKEN",
    "CARE_OPERATOR_TOKENS",
    "CARE_PHARMACY_ENVIRONMENT",
    "CARE_PHARMACY_API_KEY",
    "CARE_PHARMACY_BASE_URL",
    "CARE_PHARMACY_PAGE_SIZE",
    "CARE_SYNC_MAX_RETRIES",
    "CARE_SYNC_BACKOFF",
    "CARE_SYNC_ENABLED_JOB_TYPES",
    "CARE_SYNC_DEFAULT_INTERVAL_MINUTES",
    "CARE_PRICING_PEAK_WINDOWS",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for key in CARE_VARS {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn set_env(key: &str, value: &str) {
    unsafe {
        env::set_var(key, value);
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

fn loader_in(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let cfg = loader_in(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.log_format, "json");
    assert_eq!(cfg.local_utc_offset_minutes, 330);
    assert_eq!(cfg.pharmacy.environment, PharmacyEnvironment::Staging);
    assert_eq!(cfg.pharmacy.page_size, 100);
    assert_eq!(cfg.sync.default_interval_minutes, 60);
    assert_eq!(cfg.sync.max_retries, 3);
    assert_eq!(cfg.sync.retry_base_seconds, 300);
    assert_eq!(cfg.sync.backoff, BackoffCurve::Linear);
    assert_eq!(cfg.sync.enabled_job_types, vec!["products", "stock"]);
    assert_eq!(cfg.pricing.peak_windows.len(), 2);
    assert_eq!(cfg.capacity.max_lookahead_hours, 72);
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "CARE_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "CARE_API_BIND_ADDR=192.168.0.10:5000\nCARE_SYNC_MAX_RETRIES=5\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "CARE_API_BIND_ADDR=10.0.0.5:6000\n",
    );
    // Profile chosen in .env.local decides which profile files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "CARE_PROFILE=test\nCARE_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let cfg = loader_in(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.sync.max_retries, 5);
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "CARE_API_BIND_ADDR=127.0.0.1:3000\nCARE_LOG_LEVEL=debug\n",
    );
    set_env("CARE_API_BIND_ADDR", "0.0.0.0:9090");

    let cfg = loader_in(&temp_dir).load().expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.log_level, "debug");

    clear_env();
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    set_env("CARE_API_BIND_ADDR", "not-an-addr");
    let err = loader_in(&temp_dir)
        .load()
        .expect_err("invalid bind addr should fail");
    assert!(format!("{err}").contains("invalid api bind address"));

    clear_env();
}

#[test]
fn deployed_profiles_require_operator_tokens_and_api_key() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    set_env("CARE_PROFILE", "production");
    let err = loader_in(&temp_dir).load().expect_err("tokens required");
    assert!(matches!(err, ConfigError::MissingOperatorTokens));

    set_env("CARE_OPERATOR_TOKENS", "alpha, beta,,");
    let err = loader_in(&temp_dir).load().expect_err("api key required");
    assert!(matches!(err, ConfigError::MissingPharmacyApiKey));

    set_env("CARE_PHARMACY_API_KEY", "secret-key");
    let cfg = loader_in(&temp_dir).load().expect("complete production config");
    assert_eq!(cfg.operator_tokens, vec!["alpha", "beta"]);
    assert_eq!(cfg.pharmacy.api_key.as_deref(), Some("secret-key"));

    clear_env();
}

#[test]
fn production_pharmacy_environment_changes_url_and_interval() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    set_env("CARE_PHARMACY_ENVIRONMENT", "production");
    let cfg = loader_in(&temp_dir).load().expect("production environment");
    assert_eq!(cfg.pharmacy.environment, PharmacyEnvironment::Production);
    assert_eq!(cfg.pharmacy.effective_base_url(), "https://api.evitalrx.in/v1/");
    assert_eq!(cfg.sync.default_interval_minutes, 30);

    set_env("CARE_SYNC_DEFAULT_INTERVAL_MINUTES", "15");
    set_env("CARE_PHARMACY_BASE_URL", "http://127.0.0.1:9999/v1/");
    let cfg = loader_in(&temp_dir).load().expect("explicit overrides");
    assert_eq!(cfg.sync.default_interval_minutes, 15);
    assert_eq!(cfg.pharmacy.effective_base_url(), "http://127.0.0.1:9999/v1/");

    clear_env();
}

#[test]
fn sync_and_pricing_values_are_validated() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    set_env("CARE_SYNC_ENABLED_JOB_TYPES", "products,invoices");
    let err = loader_in(&temp_dir).load().expect_err("unknown job type");
    assert!(matches!(err, ConfigError::UnknownJobType { ref value } if value == "invoices"));
    clear_env();

    set_env("CARE_PRICING_PEAK_WINDOWS", "10:00-08:00");
    let err = loader_in(&temp_dir).load().expect_err("inverted window");
    assert!(matches!(err, ConfigError::InvalidPeakWindow { .. }));
    clear_env();

    set_env("CARE_SYNC_BACKOFF", "fibonacci");
    let err = loader_in(&temp_dir).load().expect_err("unknown curve");
    assert!(matches!(err, ConfigError::InvalidBackoffCurve { .. }));
    clear_env();

    set_env("CARE_PHARMACY_PAGE_SIZE", "lots");
    let err = loader_in(&temp_dir).load().expect_err("non numeric page size");
    assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "CARE_PHARMACY_PAGE_SIZE"));
    clear_env();

    set_env("CARE_PRICING_PEAK_WINDOWS", "07:30-09:00, 17:00-20:30");
    set_env("CARE_SYNC_BACKOFF", "exponential");
    let cfg = loader_in(&temp_dir).load().expect("custom windows");
    let windows: Vec<String> = cfg
        .pricing
        .peak_windows
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(windows, vec!["07:30-09:00", "17:00-20:30"]);
    assert_eq!(cfg.sync.backoff, BackoffCurve::Exponential);

    clear_env();
}

#[test]
fn redacted_json_hides_secrets() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    set_env("CARE_OPERATOR_TOKEN", "super-secret-token");
    set_env("CARE_PHARMACY_API_KEY", "super-secret-key");
    let cfg = loader_in(&temp_dir).load().expect("config loads");

    let json = cfg.redacted_json().expect("serializes");
    assert!(!json.contains("super-secret-token"));
    assert!(!json.contains("super-secret-key"));
    assert!(json.contains("[REDACTED]"));

    clear_env();
}
