use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use client_core::{
    identifiers::parse_complaint_id,
    review::{Receipt, ReviewSection, SuccessNotice},
    taxonomy::{self, Category},
    validation::{validate_otp_code, validate_phone},
    ComplaintApi, FormView, HostEnvironment, HttpComplaintApi, IssuedBy, LocalSecret,
    OfflineComplaintApi, Settings, WizardController,
};
use serde::Serialize;
use shared::domain::FieldId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::{
    cli::OtpAction,
    draft::{load_draft, prepare_wizard},
    output::{print_one, print_out},
};

#[derive(Serialize)]
struct SubmitOutput {
    issued_locally: bool,
    phone_verified: bool,
    notice: SuccessNotice,
    receipt: Receipt,
}

#[derive(Serialize)]
struct TrackOutput {
    complaint_id: String,
    track_link: Option<String>,
}

enum CodeSource<'a> {
    Offline(&'a OfflineComplaintApi),
    Prompt,
}

fn render_section(section: &ReviewSection) -> String {
    let mut out = format!("[{}] {}", section.step.number(), section.title);
    for row in &section.rows {
        out.push_str(&format!("\n  {}: {}", row.label, row.value));
    }
    out
}

fn render_category(category: &Category) -> String {
    let mut out = format!("{}  {}", category.key, category.label);
    for sub in category.subcategories {
        out.push_str(&format!("\n    {}  {}", sub.key, sub.label));
    }
    out
}

fn render_submission(output: &SubmitOutput) -> String {
    let receipt = &output.receipt;
    let mut out = format!(
        "Complaint submitted.\n  Complaint ID: {}\n  PIN/Access Key: {}\n  Track: {}",
        output.notice.complaint_id, output.notice.secret, output.notice.track_link
    );
    if output.issued_locally {
        out.push_str("\n  (offline: identifiers were issued locally and are not registered)");
    }
    out.push_str(&format!(
        "\n\n{}\nComplaint Receipt\nSubmitted on {}  Status: {}",
        receipt.university, receipt.submitted_on, receipt.status
    ));
    for row in receipt.complainant.iter().chain(&receipt.complaint) {
        out.push_str(&format!("\n  {}: {}", row.label, row.value));
    }
    out.push_str(&format!(
        "\nQuestions: {} / {}",
        receipt.contact_email, receipt.contact_phone
    ));
    out
}

/// Host facts for a terminal session, used when the draft carries none.
pub fn terminal_environment() -> HostEnvironment {
    HostEnvironment {
        user_agent: format!("portal_cli/{}", env!("CARGO_PKG_VERSION")),
        language: std::env::var("LANG").unwrap_or_default(),
        platform: std::env::consts::OS.to_string(),
        ..HostEnvironment::default()
    }
}

pub async fn review(json: bool, settings: Arc<Settings>, draft_path: &Path) -> Result<()> {
    let draft = load_draft(draft_path).await?;
    let (wizard, _rejected) = prepare_wizard(settings, &draft).await?;
    print_out(json, &wizard.review(), render_section)
}

async fn prompt_code(phone: &str) -> Option<String> {
    eprint!("Enter the 6-digit code sent to {phone}: ");
    let mut line = String::new();
    match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

/// Best effort: a failed verification is logged and the complaint goes out unverified.
async fn verify_phone(
    wizard: &mut WizardController,
    api: &dyn ComplaintApi,
    source: CodeSource<'_>,
) {
    if let Err(err) = wizard.send_otp(api).await {
        warn!(error = %err, "could not send verification code");
        return;
    }
    let phone = wizard.text(FieldId::Phone).trim().to_string();
    let code = match source {
        CodeSource::Offline(offline) => offline.pending_otp(&phone).await,
        CodeSource::Prompt => prompt_code(&phone).await,
    };
    let Some(code) = code else {
        warn!("no verification code entered");
        return;
    };
    if let Err(err) = wizard.verify_otp(api, &code).await {
        warn!(error = %err, "phone verification failed");
    }
}

pub async fn submit(
    json: bool,
    settings: Arc<Settings>,
    draft_path: &Path,
    offline: bool,
    access_key: bool,
) -> Result<()> {
    let draft = load_draft(draft_path).await?;
    let env = draft
        .environment
        .clone()
        .unwrap_or_else(terminal_environment);
    let (mut wizard, _rejected) = prepare_wizard(settings.clone(), &draft).await?;

    let result = if offline {
        let secret = if access_key {
            LocalSecret::AccessKey
        } else {
            LocalSecret::Pin
        };
        let api = OfflineComplaintApi::with_secret(secret);
        if wizard.sms_enabled() {
            verify_phone(&mut wizard, &api, CodeSource::Offline(&api)).await;
        }
        wizard.submit(&api, &env).await?
    } else {
        let api = HttpComplaintApi::new(settings)?;
        if wizard.sms_enabled() {
            verify_phone(&mut wizard, &api, CodeSource::Prompt).await;
        }
        wizard.submit(&api, &env).await?
    };

    let output = SubmitOutput {
        issued_locally: result.issued_by == IssuedBy::Local,
        phone_verified: wizard.otp_verified(),
        notice: wizard
            .success_notice()
            .context("submission finished without a notice")?,
        receipt: wizard
            .receipt()
            .context("submission finished without a receipt")?,
    };
    print_one(json, output, render_submission)
}

pub async fn otp(json: bool, settings: Arc<Settings>, action: &OtpAction) -> Result<()> {
    let api = HttpComplaintApi::new(settings)?;
    match action {
        OtpAction::Send { phone } => {
            validate_phone(phone)?;
            api.send_otp(phone.trim()).await?;
            info!("verification code requested");
            print_one(json, "OTP sent", |msg| format!("{msg} to {phone}"))
        }
        OtpAction::Verify { phone, code } => {
            validate_phone(phone)?;
            validate_otp_code(code.trim())?;
            api.verify_otp(phone.trim(), code.trim()).await?;
            print_one(json, "Phone number verified", |msg| msg.to_string())
        }
    }
}

pub fn list_taxonomy(json: bool) -> Result<()> {
    print_out(json, taxonomy::categories(), render_category)
}

pub fn track(json: bool, settings: &Settings, raw_id: &str, pin: Option<&str>) -> Result<()> {
    let complaint_id = parse_complaint_id(raw_id)?;
    let output = TrackOutput {
        complaint_id: complaint_id.to_string(),
        track_link: pin.map(|pin| settings.track_link(complaint_id, pin.trim())),
    };
    print_one(json, output, |out| match &out.track_link {
        Some(link) => format!("{} is well-formed. Track it at {link}", out.complaint_id),
        None => format!("{} is well-formed", out.complaint_id),
    })
}
