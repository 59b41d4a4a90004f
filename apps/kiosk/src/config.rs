use std::{collections::HashMap, fs};

#[derive(Debug, Clone)]
pub struct Settings {
    pub analyze_base_url: String,
    pub members_url: String,
    pub upload_page_url: String,
    pub database_url: String,
    pub probe_timeout_ms: u64,
    pub probe_max_check: usize,
    pub rotation_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            analyze_base_url: "http://127.0.0.1:8000".into(),
            members_url: "http://127.0.0.1:3000/member_data_final_cleaned.json".into(),
            upload_page_url: "http://127.0.0.1:3000/upload".into(),
            database_url: "sqlite://./data/kiosk.db".into(),
            probe_timeout_ms: 6000,
            probe_max_check: 500,
            rotation_interval_ms: 7000,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("kiosk.toml") {
        apply_file_config(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings);

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };

    let string_of = |key: &str| {
        file_cfg
            .get(key)
            .and_then(|value| value.as_str())
            .map(|value| value.to_string())
    };
    if let Some(v) = string_of("analyze_base_url") {
        settings.analyze_base_url = v;
    }
    if let Some(v) = string_of("members_url") {
        settings.members_url = v;
    }
    if let Some(v) = string_of("upload_page_url") {
        settings.upload_page_url = v;
    }
    if let Some(v) = string_of("database_url") {
        settings.database_url = v;
    }

    let integer_of = |key: &str| file_cfg.get(key).and_then(|value| value.as_integer());
    if let Some(v) = integer_of("probe_timeout_ms") {
        settings.probe_timeout_ms = v.max(0) as u64;
    }
    if let Some(v) = integer_of("probe_max_check") {
        settings.probe_max_check = v.max(0) as usize;
    }
    if let Some(v) = integer_of("rotation_interval_ms") {
        settings.rotation_interval_ms = v.max(0) as u64;
    }
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(v) = std::env::var("APP__ANALYZE_BASE_URL") {
        settings.analyze_base_url = v;
    }
    if let Ok(v) = std::env::var("APP__MEMBERS_URL") {
        settings.members_url = v;
    }
    if let Ok(v) = std::env::var("APP__UPLOAD_PAGE_URL") {
        settings.upload_page_url = v;
    }
    if let Ok(v) = std::env::var("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("APP__PROBE_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.probe_timeout_ms = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__PROBE_MAX_CHECK") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.probe_max_check = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__ROTATION_INTERVAL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.rotation_interval_ms = parsed;
        }
    }
}
