//! WebAssembly bindings for Detour
//!
//! The background script reads settings from `chrome.storage`, passes them in
//! as JSON with every navigation, and applies whatever comes back: a tab
//! update for redirects and a `storage.set` for the returned patch.

use std::sync::OnceLock;

use log::{warn, Level, LevelFilter, Log, Metadata, Record};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use wasm_bindgen::prelude::*;

use dt_compiler::normalize_site;
use dt_core::snooze::{
    cleanup_expired_snooze, clear_snooze, format_remaining, snooze_for, snooze_remaining, snooze_site, status,
    Status,
};
use dt_core::url::format_destination_url;
use dt_core::{AllowReason, Engine, Moment, NavigationEvent, Outcome, Settings, SettingsPatch};

static ENGINE: OnceLock<Engine> = OnceLock::new();

fn engine() -> &'static Engine {
    ENGINE.get_or_init(Engine::new)
}

// =============================================================================
// Logging
// =============================================================================

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[detour] {}", record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            Level::Info => web_sys::console::info_1(&line),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

/// Route engine logs to the console. `level` is one of error, warn, info,
/// debug, trace or off.
#[wasm_bindgen]
pub fn init_logging(level: &str) -> Result<(), JsValue> {
    let filter: LevelFilter = level
        .parse()
        .map_err(|_| JsValue::from_str(&format!("Unknown log level '{}'", level)))?;
    // A second call only changes the level
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(filter);
    Ok(())
}

// =============================================================================
// Decisions
// =============================================================================

/// Evaluate one navigation.
///
/// Returns `{ outcome, redirectUrl?, trigger?, delayMs?, patch? }`. The caller
/// must persist `patch` and update the tab when `outcome` is `"redirect"`.
#[wasm_bindgen]
pub fn decide(tab_id: i32, url: &str, is_main_frame: bool, settings_json: &str) -> JsValue {
    let event = NavigationEvent {
        tab_id,
        url: url.to_string(),
        is_main_frame,
    };

    let engine = engine();
    let outcome = match engine.screen(&event) {
        Some(skipped) => skipped,
        None => match Settings::from_json(settings_json) {
            Ok(settings) => engine.evaluate(&event, &settings, &now(), &mut rng()),
            Err(e) => {
                warn!("tab {}: {}; leaving navigation alone", tab_id, e);
                Outcome::Allowed(AllowReason::SettingsUnavailable)
            }
        },
    };

    outcome_to_js(&outcome)
}

/// Forget guard state for a closed tab.
#[wasm_bindgen]
pub fn forget_tab(tab_id: i32) {
    engine().guard().forget(tab_id);
}

#[wasm_bindgen]
pub fn reset_guard() {
    engine().guard().clear();
}

/// Whether the next navigation on this tab will be skipped as our own.
#[wasm_bindgen]
pub fn is_tab_armed(tab_id: i32) -> bool {
    engine().guard().is_armed(tab_id)
}

#[wasm_bindgen]
pub fn armed_tab_count() -> u32 {
    engine().guard().armed_count() as u32
}

// =============================================================================
// Snooze
// =============================================================================

/// Patch clearing an expired snooze, or `null`. Call on browser startup.
#[wasm_bindgen]
pub fn startup_patch(settings_json: &str) -> Result<JsValue, JsValue> {
    let settings = parse_settings(settings_json)?;
    match cleanup_expired_snooze(&settings, &now()) {
        Some(patch) => patch_to_js(&patch),
        None => Ok(JsValue::NULL),
    }
}

#[wasm_bindgen]
pub fn snooze_patch(minutes: u32) -> Result<JsValue, JsValue> {
    patch_to_js(&snooze_for(&now(), minutes))
}

#[wasm_bindgen]
pub fn clear_snooze_patch() -> Result<JsValue, JsValue> {
    patch_to_js(&clear_snooze())
}

#[wasm_bindgen]
pub fn site_snooze_patch(settings_json: &str, trigger: &str, minutes: u32) -> Result<JsValue, JsValue> {
    let settings = parse_settings(settings_json)?;
    patch_to_js(&snooze_site(&settings, trigger, &now(), minutes))
}

/// Popup status: `{ status, until?, remaining? }`.
#[wasm_bindgen]
pub fn get_status(settings_json: &str) -> Result<JsValue, JsValue> {
    let settings = parse_settings(settings_json)?;
    let now = now();
    let result = js_sys::Object::new();

    let label = match status(&settings, &now) {
        Status::Focus => "focus",
        Status::ScheduleBlocked => "schedule-blocked",
        Status::Snoozed { until } => {
            let _ = js_sys::Reflect::set(&result, &"until".into(), &JsValue::from_f64(until as f64));
            if let Some(remaining) = snooze_remaining(&settings, &now) {
                let _ = js_sys::Reflect::set(&result, &"remaining".into(), &JsValue::from_str(&format_remaining(remaining)));
            }
            "snoozed"
        }
        Status::Active => "active",
    };
    let _ = js_sys::Reflect::set(&result, &"status".into(), &JsValue::from_str(label));

    Ok(result.into())
}

// =============================================================================
// Site strings
// =============================================================================

#[wasm_bindgen]
pub fn normalize_site_js(input: &str, keep_path: bool) -> Option<String> {
    normalize_site(input, keep_path)
}

#[wasm_bindgen]
pub fn format_destination_url_js(destination: &str) -> String {
    format_destination_url(destination).into_owned()
}

// =============================================================================
// Helpers
// =============================================================================

/// Local wall time from the JS clock, the same view the options page has.
fn now() -> Moment {
    let date = js_sys::Date::new_0();
    Moment {
        epoch_ms: date.get_time() as i64,
        weekday: date.get_day() as u8,
        minute_of_day: (date.get_hours() * 60 + date.get_minutes()) as u16,
    }
}

fn rng() -> SmallRng {
    SmallRng::seed_from_u64((js_sys::Math::random() * u64::MAX as f64) as u64)
}

fn parse_settings(settings_json: &str) -> Result<Settings, JsValue> {
    Settings::from_json(settings_json).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn patch_to_js(patch: &SettingsPatch) -> Result<JsValue, JsValue> {
    let json = patch.to_json().map_err(|e| JsValue::from_str(&e.to_string()))?;
    js_sys::JSON::parse(&json)
}

fn outcome_to_js(outcome: &Outcome) -> JsValue {
    let js_result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&js_result, &"outcome".into(), &JsValue::from_str(outcome.label()));

    if let Some(redirect) = outcome.redirect() {
        let _ = js_sys::Reflect::set(&js_result, &"redirectUrl".into(), &JsValue::from_str(&redirect.destination_url));
        let _ = js_sys::Reflect::set(&js_result, &"trigger".into(), &JsValue::from_str(&redirect.trigger));
        let _ = js_sys::Reflect::set(&js_result, &"delayMs".into(), &JsValue::from_f64(redirect.delay_ms as f64));
        match patch_to_js(&redirect.patch) {
            Ok(patch) => {
                let _ = js_sys::Reflect::set(&js_result, &"patch".into(), &patch);
            }
            Err(_) => warn!("tab {}: could not encode stats patch", redirect.tab_id),
        }
    }

    js_result.into()
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_decide_redirect_then_guard() {
        reset_guard();
        let settings = r#"{"triggerSites":["reddit.com"],"destinations":["wikipedia.org"]}"#;

        let first = decide(7, "https://www.reddit.com/", true, settings);
        let outcome = js_sys::Reflect::get(&first, &"outcome".into()).unwrap();
        assert_eq!(outcome.as_string().as_deref(), Some("redirect"));
        let url = js_sys::Reflect::get(&first, &"redirectUrl".into()).unwrap();
        assert_eq!(url.as_string().as_deref(), Some("https://wikipedia.org"));
        assert_eq!(armed_tab_count(), 1);
        assert!(is_tab_armed(7));

        let second = decide(7, "https://wikipedia.org/", true, settings);
        let outcome = js_sys::Reflect::get(&second, &"outcome".into()).unwrap();
        assert_eq!(outcome.as_string().as_deref(), Some("skipped-guard"));
        assert!(!is_tab_armed(7));
        assert_eq!(armed_tab_count(), 0);
    }

    #[wasm_bindgen_test]
    fn test_decide_bad_settings() {
        reset_guard();
        let result = decide(1, "https://reddit.com/", true, "not json");
        let outcome = js_sys::Reflect::get(&result, &"outcome".into()).unwrap();
        assert_eq!(outcome.as_string().as_deref(), Some("allowed-settings-unavailable"));
    }

    #[wasm_bindgen_test]
    fn test_site_helpers() {
        assert_eq!(normalize_site_js("https://www.Example.com/a/", true).as_deref(), Some("example.com/a"));
        assert_eq!(format_destination_url_js("example.org"), "https://example.org");
    }
}
