use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SUBMIT_ROUTE: &str = "/complaints/submit";
pub const OTP_SEND_ROUTE: &str = "/otp/send";
pub const OTP_VERIFY_ROUTE: &str = "/otp/verify";

/// Multipart part carrying the JSON-encoded [`ComplaintPayload`].
pub const DATA_PART: &str = "data";
/// Multipart part name repeated once per attached file.
pub const ATTACHMENTS_PART: &str = "attachments";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub os_version: String,
    pub device: String,
    pub device_model: String,
    pub screen_resolution: String,
    pub language: String,
    pub timezone: String,
    pub platform: String,
}

/// Network hints; any the host leaves out keep their `unknown`/zero default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub connection_type: String,
    pub effective_type: String,
    pub downlink: f64,
    pub rtt: u32,
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self {
            connection_type: "unknown".into(),
            effective_type: "unknown".into(),
            downlink: 0.0,
            rtt: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub changes_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAnalytics {
    pub time_to_complete: u64,
    pub started_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    pub total_edits: u32,
    pub field_changes: Vec<FieldChange>,
    pub tab_switches: u32,
    pub copy_paste_count: u32,
    pub click_count: u32,
    pub keyboard_events: u32,
    pub idle_time: u64,
    pub active_time: u64,
    pub mouse_movements: u32,
}

/// Body of the `data` part of a complaint submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintPayload {
    pub user_type: String,
    pub complaint_scope: String,
    pub visibility: String,

    pub full_name: String,
    pub user_id: String,
    pub email: String,
    pub phone: String,
    pub alternate_phone: String,

    pub college: String,
    pub department: String,
    pub program: String,
    pub batch: String,
    pub semester: String,
    pub designation: String,
    pub experience: String,
    pub staff_role: String,

    pub group_name: String,
    pub group_size: String,
    pub group_members: String,

    pub primary_category: String,
    pub sub_category: String,
    pub complaint_level: String,

    pub course_code: String,
    pub course_name: String,
    pub faculty_name: String,

    pub title: String,
    pub description: String,
    pub urgency: String,

    pub sms_verification_enabled: bool,
    pub phone_verified: bool,

    pub device_info: DeviceInfo,
    pub connection_info: ConnectionInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<Geolocation>,
    pub form_analytics: FormAnalytics,

    pub user_agent: String,
    pub submitted_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complaint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpSendRequest {
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpVerifyRequest {
    pub phone: String,
    pub otp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
