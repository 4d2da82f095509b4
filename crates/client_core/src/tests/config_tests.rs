use super::*;

use std::{collections::HashMap, fs};

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn defaults_match_portal_limits() {
    let settings = Settings::default();
    assert_eq!(settings.max_file_size, 10 * 1024 * 1024);
    assert_eq!(settings.max_files, 5);
    assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    assert_eq!(settings.allowed_file_types.len(), 5);
    assert!(settings
        .allowed_file_types
        .iter()
        .any(|mime| mime == MIME_DOCX));
}

#[test]
fn endpoint_joins_base_and_route_with_single_slash() {
    let mut settings = Settings::default();
    settings.api_base_url = "https://portal.example/api/".into();
    assert_eq!(
        settings.endpoint("/complaints/submit"),
        "https://portal.example/api/complaints/submit"
    );
}

#[test]
fn missing_settings_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(&dir.path().join("absent.toml")).expect("load");
    assert_eq!(settings.app_name, Settings::default().app_name);
}

#[test]
fn settings_file_overrides_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("portal.toml");
    fs::write(
        &path,
        "api_base_url = \"https://complaints.example/api\"\nmax_files = 3\nrequest_timeout_ms = 5000\n",
    )
    .expect("write");

    let settings = load_settings_from(&path).expect("load");
    assert_eq!(settings.max_files, 3);
    assert_eq!(settings.request_timeout_ms, 5000);
}

#[test]
fn malformed_settings_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("portal.toml");
    fs::write(&path, "max_files = \"many\"").expect("write");

    let err = load_settings_from(&path).expect_err("must fail");
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn env_overrides_win_and_bad_numbers_are_ignored() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_of(&[
            ("PORTAL_API_BASE_URL", "https://a.example/api"),
            ("APP__API_BASE_URL", "https://b.example/api"),
            ("APP__MAX_FILES", "2"),
            ("APP__REQUEST_TIMEOUT_MS", "soon"),
        ]),
    );
    assert_eq!(settings.api_base_url, "https://b.example/api");
    assert_eq!(settings.max_files, 2);
    assert_eq!(settings.request_timeout_ms, 30_000);
}

#[test]
fn relative_base_url_is_rejected() {
    let err = validate_base_url("/api").expect_err("relative url");
    assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
    validate_base_url("http://localhost:5000/api").expect("absolute url");
}

#[test]
fn track_link_carries_id_and_pin() {
    let settings = Settings::default();
    assert_eq!(
        settings.track_link("CMP-2026-000123", "654321"),
        "track-complaint.html?id=CMP-2026-000123&pin=654321"
    );
}
