use serde::{Deserialize, Serialize};
use std::time::Duration;
use wasm_bindgen::JsValue;

pub(crate) const DEFAULT_API_URL: &str = "";
pub(crate) const DEFAULT_DEBOUNCE_MS: u64 = 3_000;
pub(crate) const DEFAULT_PERIODIC_SAVE_MS: u64 = 120_000;

/// Page-provided configuration.
///
/// Read from `window.ENV` (both `API_URL` and `api_url` spellings are
/// accepted), with `window.RESOURCE_ID` as the fallback for the resource id
/// since that is where the server-rendered page puts it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct EnvConfig {
    /// Empty means same-origin (`/api/...`).
    pub api_url: String,
    pub resource_id: Option<String>,
    pub csrf_token: Option<String>,
    pub autosave: AutosaveConfig,
}

impl EnvConfig {
    pub fn new() -> Self {
        let mut cfg = Self {
            api_url: DEFAULT_API_URL.to_string(),
            resource_id: None,
            csrf_token: None,
            autosave: AutosaveConfig::default(),
        };

        let Some(window) = web_sys::window() else {
            return cfg;
        };

        if let Some(env) = window.get("ENV") {
            if !env.is_undefined() && env.is_object() {
                let env: JsValue = env.into();
                if let Some(url) = env_string(&env, &["API_URL", "api_url"]) {
                    cfg.api_url = url;
                }
                cfg.resource_id = env_string(&env, &["RESOURCE_ID", "resource_id"]);
                if let Some(ms) = env_millis(&env, &["AUTOSAVE_DEBOUNCE_MS", "autosave_debounce_ms"]) {
                    cfg.autosave.debounce = Duration::from_millis(ms);
                }
                if let Some(ms) = env_millis(&env, &["PERIODIC_SAVE_MS", "periodic_save_ms"]) {
                    cfg.autosave.periodic = Duration::from_millis(ms);
                }
                if let Some(on) = env_flag(&env, &["AUTOSAVE_ENABLED", "autosave_enabled"]) {
                    cfg.autosave.enabled = on;
                }
            }
        }

        if cfg.resource_id.is_none() {
            if let Ok(v) = js_sys::Reflect::get(&window, &"RESOURCE_ID".into()) {
                cfg.resource_id = js_value_to_string(&v);
            }
        }

        cfg.csrf_token = window
            .document()
            .and_then(|d| d.query_selector("meta[name=\"csrf-token\"]").ok().flatten())
            .and_then(|meta| meta.get_attribute("content"))
            .filter(|t| !t.trim().is_empty());

        cfg
    }
}

/// Autosave timing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AutosaveConfig {
    /// Quiet period after the last edit before an automatic save.
    pub debounce: Duration,
    /// Fallback save cadence, independent of typing.
    pub periodic: Duration,
    /// Used until the learner flips the toggle (that choice is persisted).
    pub enabled: bool,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            periodic: Duration::from_millis(DEFAULT_PERIODIC_SAVE_MS),
            enabled: true,
        }
    }
}

impl AutosaveConfig {
    pub fn debounce_ms(&self) -> i32 {
        clamp_ms(self.debounce)
    }

    pub fn periodic_ms(&self) -> i32 {
        clamp_ms(self.periodic)
    }
}

// Browser timers take an i32 millisecond delay.
fn clamp_ms(d: Duration) -> i32 {
    i32::try_from(d.as_millis()).unwrap_or(i32::MAX)
}

fn env_string(env: &JsValue, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| js_sys::Reflect::get(env, &(*k).into()).ok())
        .find_map(|v| js_value_to_string(&v))
}

fn env_millis(env: &JsValue, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|k| js_sys::Reflect::get(env, &(*k).into()).ok())
        .find_map(|v| {
            v.as_f64()
                .filter(|n| n.is_finite() && *n > 0.0)
                .map(|n| n as u64)
                .or_else(|| v.as_string().and_then(|s| s.trim().parse().ok()))
        })
}

fn env_flag(env: &JsValue, keys: &[&str]) -> Option<bool> {
    keys.iter()
        .filter_map(|k| js_sys::Reflect::get(env, &(*k).into()).ok())
        .find_map(|v| v.as_bool().or_else(|| v.as_string().and_then(|s| parse_flag(&s))))
}

/// Accepts `1`/`true`/`on`/`yes` and their opposites, in any case.
pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

// The page may render the id as a number or a string.
fn js_value_to_string(v: &JsValue) -> Option<String> {
    if let Some(s) = v.as_string() {
        let s = s.trim().to_string();
        return (!s.is_empty()).then_some(s);
    }
    v.as_f64()
        .filter(|n| n.is_finite())
        .map(|n| format!("{}", n as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autosave_defaults() {
        let cfg = AutosaveConfig::default();
        assert_eq!(cfg.debounce, Duration::from_secs(3));
        assert_eq!(cfg.periodic, Duration::from_secs(120));
        assert!(cfg.enabled);
        assert_eq!(cfg.debounce_ms(), 3_000);
        assert_eq!(cfg.periodic_ms(), 120_000);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("OFF"), Some(false));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_flag(""), None);
    }

    #[test]
    fn test_timer_delay_is_clamped() {
        let cfg = AutosaveConfig {
            debounce: Duration::from_secs(u64::MAX / 2),
            ..Default::default()
        };
        assert_eq!(cfg.debounce_ms(), i32::MAX);
    }
}
