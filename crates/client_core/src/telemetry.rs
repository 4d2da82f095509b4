//! Environment sniffing and interaction analytics sent alongside a submission.
//!
//! Nothing here reads a clock on its own: every recording method takes the current
//! [`Instant`] so the host event loop (and tests) decide what "now" is.

use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use shared::{
    domain::FieldId,
    protocol::{ConnectionInfo, DeviceInfo, FieldChange, FormAnalytics, Geolocation},
};

/// Inactivity longer than this counts towards idle time.
pub const IDLE_THRESHOLD: Duration = Duration::from_secs(3);
/// A burst of mouse movement is sampled once it has been still for this long.
pub const MOUSE_SAMPLE_QUIET: Duration = Duration::from_millis(100);
/// Mouse movement refreshes the activity clock at most this often.
pub const MOUSE_ACTIVITY_THROTTLE: Duration = Duration::from_millis(250);

/// Facts about the host the form runs in, as far as the host is willing to share them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostEnvironment {
    pub user_agent: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub language: String,
    pub timezone: String,
    pub platform: String,
    pub connection: Option<ConnectionInfo>,
    pub geolocation: Option<Geolocation>,
}

impl HostEnvironment {
    pub fn device_info(&self) -> DeviceInfo {
        let mut info = sniff_user_agent(&self.user_agent);
        info.screen_resolution = format!("{}x{}", self.screen_width, self.screen_height);
        info.language = self.language.clone();
        info.timezone = self.timezone.clone();
        info.platform = self.platform.clone();
        info
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        self.connection.clone().unwrap_or_default()
    }
}

fn capture(re: &Regex, haystack: &str) -> String {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

static EDGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Edg(?:e|A|iOS)?/([0-9.]+)").expect("edge"));
static FIREFOX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Firefox/([0-9.]+)").expect("firefox"));
static CHROME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Chrome/([0-9.]+)").expect("chrome"));
static SAFARI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Version/([0-9.]+)").expect("safari"));
static MAC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Mac OS X ([0-9_]+)").expect("mac"));
static ANDROID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Android ([0-9.]+)").expect("android"));
static IOS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"OS ([0-9_]+)").expect("ios"));
static MOBILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Mobile|Android|iPhone").expect("mobile"));
static TABLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Tablet|iPad").expect("tablet"));

/// Best-effort browser, OS and device classification from a user-agent string.
pub fn sniff_user_agent(ua: &str) -> DeviceInfo {
    let (browser, browser_version) = if EDGE_RE.is_match(ua) {
        ("Edge", capture(&EDGE_RE, ua))
    } else if ua.contains("Firefox") {
        ("Firefox", capture(&FIREFOX_RE, ua))
    } else if ua.contains("Chrome") {
        ("Chrome", capture(&CHROME_RE, ua))
    } else if ua.contains("Safari") {
        ("Safari", capture(&SAFARI_RE, ua))
    } else {
        ("Unknown", String::new())
    };

    // iOS user agents also say "like Mac OS X", Android ones also say "Linux".
    let (os, os_version) = if ua.contains("Windows NT 10.0") {
        ("Windows", "10/11".to_string())
    } else if ua.contains("Windows NT 6.3") {
        ("Windows", "8.1".to_string())
    } else if ua.contains("Windows NT 6.2") {
        ("Windows", "8".to_string())
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iOS") {
        ("iOS", capture(&IOS_RE, ua).replace('_', "."))
    } else if ua.contains("Mac OS X") {
        ("macOS", capture(&MAC_RE, ua).replace('_', "."))
    } else if ua.contains("Android") {
        ("Android", capture(&ANDROID_RE, ua))
    } else if ua.contains("Linux") {
        ("Linux", String::new())
    } else {
        ("Unknown", String::new())
    };

    let (device, device_model) = if TABLET_RE.is_match(ua) {
        ("Tablet", if ua.contains("iPad") { "iPad" } else { "" })
    } else if MOBILE_RE.is_match(ua) {
        let model = if ua.contains("iPhone") {
            "iPhone"
        } else if ua.contains("Android") {
            "Android Device"
        } else {
            ""
        };
        ("Mobile", model)
    } else {
        ("Desktop", "")
    };

    DeviceInfo {
        browser: browser.to_string(),
        browser_version,
        os: os.to_string(),
        os_version,
        device: device.to_string(),
        device_model: device_model.to_string(),
        ..DeviceInfo::default()
    }
}

/// Fires once a burst of calls has gone quiet for `wait`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    wait: Duration,
    last_call: Option<Instant>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            last_call: None,
        }
    }

    /// Records a call. Returns true when the previous burst had already settled.
    pub fn call(&mut self, now: Instant) -> bool {
        let settled = self.is_settled(now);
        self.last_call = Some(now);
        settled
    }

    /// Returns true (once) if the current burst has settled by `now`.
    pub fn flush(&mut self, now: Instant) -> bool {
        let settled = self.is_settled(now);
        if settled {
            self.last_call = None;
        }
        settled
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        self.last_call
            .is_some_and(|last| now.saturating_duration_since(last) >= self.wait)
    }
}

/// Lets a call through at most once per `limit`.
#[derive(Debug, Clone)]
pub struct Throttle {
    limit: Duration,
    last_fired: Option<Instant>,
}

impl Throttle {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            last_fired: None,
        }
    }

    pub fn try_fire(&mut self, now: Instant) -> bool {
        let open = self
            .last_fired
            .map_or(true, |last| now.saturating_duration_since(last) >= self.limit);
        if open {
            self.last_fired = Some(now);
        }
        open
    }
}

/// Per-tab behavioural counters for one pass through the form.
#[derive(Debug, Clone)]
pub struct InteractionTracker {
    started_at: DateTime<Utc>,
    started: Instant,
    field_edits: BTreeMap<FieldId, u32>,
    tab_switches: u32,
    paste_count: u32,
    click_count: u32,
    keyboard_events: u32,
    mouse_movements: u32,
    mouse_sampler: Debouncer,
    mouse_activity: Throttle,
    last_activity: Instant,
    idle: Duration,
    hidden_since: Option<Instant>,
    hidden_total: Duration,
}

impl InteractionTracker {
    pub fn new(started_at: DateTime<Utc>, now: Instant) -> Self {
        Self {
            started_at,
            started: now,
            field_edits: BTreeMap::new(),
            tab_switches: 0,
            paste_count: 0,
            click_count: 0,
            keyboard_events: 0,
            mouse_movements: 0,
            mouse_sampler: Debouncer::new(MOUSE_SAMPLE_QUIET),
            mouse_activity: Throttle::new(MOUSE_ACTIVITY_THROTTLE),
            last_activity: now,
            idle: Duration::ZERO,
            hidden_since: None,
            hidden_total: Duration::ZERO,
        }
    }

    fn note_activity(&mut self, now: Instant) {
        let gap = now.saturating_duration_since(self.last_activity);
        if gap >= IDLE_THRESHOLD {
            self.idle += gap;
        }
        self.last_activity = now;
    }

    pub fn record_field_edit(&mut self, field: FieldId, now: Instant) {
        *self.field_edits.entry(field).or_insert(0) += 1;
        self.note_activity(now);
    }

    pub fn record_click(&mut self, now: Instant) {
        self.click_count += 1;
        self.note_activity(now);
    }

    pub fn record_key(&mut self, now: Instant) {
        self.keyboard_events += 1;
        self.note_activity(now);
    }

    pub fn record_paste(&mut self, now: Instant) {
        self.paste_count += 1;
        self.note_activity(now);
    }

    pub fn record_scroll(&mut self, now: Instant) {
        self.note_activity(now);
    }

    pub fn record_mouse_move(&mut self, now: Instant) {
        if self.mouse_sampler.call(now) {
            self.mouse_movements += 1;
        }
        if self.mouse_activity.try_fire(now) {
            self.note_activity(now);
        }
    }

    /// Tab hidden/shown. Hidden time counts neither as active nor as idle.
    pub fn record_visibility(&mut self, hidden: bool, now: Instant) {
        match (hidden, self.hidden_since) {
            (true, None) => {
                self.tab_switches += 1;
                self.note_activity(now);
                self.hidden_since = Some(now);
            }
            (false, Some(since)) => {
                self.hidden_total += now.saturating_duration_since(since);
                self.hidden_since = None;
                self.last_activity = now;
            }
            _ => {}
        }
    }

    pub fn edit_count(&self, field: FieldId) -> u32 {
        self.field_edits.get(&field).copied().unwrap_or(0)
    }

    pub fn snapshot(&self, submitted_at: DateTime<Utc>, now: Instant) -> FormAnalytics {
        let elapsed = now.saturating_duration_since(self.started);

        let hidden = self.hidden_total
            + self
                .hidden_since
                .map_or(Duration::ZERO, |since| now.saturating_duration_since(since));

        let trailing_gap = if self.hidden_since.is_none() {
            now.saturating_duration_since(self.last_activity)
        } else {
            Duration::ZERO
        };
        let idle = if trailing_gap >= IDLE_THRESHOLD {
            self.idle + trailing_gap
        } else {
            self.idle
        };
        let active = elapsed.saturating_sub(hidden).saturating_sub(idle);

        let mouse_movements =
            self.mouse_movements + u32::from(self.mouse_sampler.is_settled(now));

        FormAnalytics {
            time_to_complete: elapsed.as_secs(),
            started_at: self.started_at,
            submitted_at,
            total_edits: self.field_edits.values().sum(),
            field_changes: self
                .field_edits
                .iter()
                .map(|(field, count)| FieldChange {
                    field: field.wire_name().to_string(),
                    changes_count: *count,
                })
                .collect(),
            tab_switches: self.tab_switches,
            copy_paste_count: self.paste_count,
            click_count: self.click_count,
            keyboard_events: self.keyboard_events,
            idle_time: idle.as_secs(),
            active_time: active.as_secs(),
            mouse_movements,
        }
    }
}

#[cfg(test)]
#[path = "tests/telemetry_tests.rs"]
mod tests;
