//! Display models for the review screen, the success notice and the receipt.
//!
//! These are plain data. Front ends decide how to draw (and escape) them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::{ComplaintLevel, FieldId, FileDescriptor, Panel, Step},
    protocol::ComplaintPayload,
};

use crate::{api::SubmissionResult, config::Settings, taxonomy, validation::FormView};

pub const CONTACT_EMAIL: &str = "complaints@pppuniversity.ac.in";
pub const CONTACT_PHONE: &str = "+91-612-2234567";
pub const UNIVERSITY_NAME: &str = "Patliputra University";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRow {
    pub label: &'static str,
    pub value: String,
}

impl ReviewRow {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

/// One card of the review screen. Its edit action jumps back to `step`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewSection {
    pub step: Step,
    pub title: &'static str,
    pub rows: Vec<ReviewRow>,
}

impl ReviewSection {
    pub fn edit_target(&self) -> Step {
        self.step
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| row.label == label)
            .map(|row| row.value.as_str())
    }
}

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `teaching_quality` -> `Teaching quality`.
pub fn humanize_key(key: &str) -> String {
    capitalize(&key.replace('_', " "))
}

fn category_label(category: &str) -> String {
    taxonomy::category(category)
        .map(|category| category.label.to_string())
        .unwrap_or_else(|| humanize_key(category))
}

fn subcategory_label(category: &str, sub: &str) -> String {
    taxonomy::label_for(category, sub)
        .map(str::to_string)
        .unwrap_or_else(|| humanize_key(sub))
}

fn level_label(level: &str) -> String {
    level
        .parse::<ComplaintLevel>()
        .map(|level| level.label().to_string())
        .unwrap_or_else(|_| humanize_key(level))
}

fn panel_rows(view: &impl FormView, step: Step) -> impl Iterator<Item = ReviewRow> + '_ {
    FieldId::ALL
        .iter()
        .copied()
        .filter(move |field| field.step() == step && field.panel() != Panel::Always)
        .filter(|field| field.panel() != Panel::SubCategory)
        .filter(move |field| view.is_visible(*field) && !view.text(*field).trim().is_empty())
        .map(move |field| ReviewRow::new(field.label(), view.text(field)))
}

/// Summary of everything collected so far, one section per collecting step.
pub fn build_review(view: &impl FormView, attachments: &[FileDescriptor]) -> Vec<ReviewSection> {
    let mut identity = vec![
        ReviewRow::new("User Type", capitalize(view.text(FieldId::UserType))),
        ReviewRow::new("Filing As", capitalize(view.text(FieldId::ComplaintScope))),
        ReviewRow::new("Visibility", capitalize(view.text(FieldId::Visibility))),
    ];
    identity.retain(|row| !row.value.is_empty());

    let mut personal = vec![
        ReviewRow::new("Name", view.text(FieldId::FullName)),
        ReviewRow::new("ID", view.text(FieldId::UserId)),
        ReviewRow::new("Email", view.text(FieldId::Email)),
        ReviewRow::new("Phone", view.text(FieldId::Phone)),
    ];
    let alternate = view.text(FieldId::AlternatePhone);
    if !alternate.trim().is_empty() {
        personal.push(ReviewRow::new("Alternate Phone", alternate));
    }
    personal.extend(panel_rows(view, Step::Personal));

    let primary = view.text(FieldId::PrimaryCategory);
    let mut category = vec![ReviewRow::new("Primary", category_label(primary))];
    let sub = view.text(FieldId::SubCategory);
    if !sub.is_empty() {
        category.push(ReviewRow::new("Sub-Category", subcategory_label(primary, sub)));
    }
    category.push(ReviewRow::new(
        "Scope",
        level_label(view.text(FieldId::ComplaintLevel)),
    ));
    category.extend(panel_rows(view, Step::Category));

    let mut details = vec![
        ReviewRow::new("Title", view.text(FieldId::Title)),
        ReviewRow::new("Description", view.text(FieldId::Description)),
        ReviewRow::new("Urgency", capitalize(view.text(FieldId::Urgency))),
    ];
    if !attachments.is_empty() {
        details.push(ReviewRow::new(
            "Attachments",
            format!("{} file(s) uploaded", attachments.len()),
        ));
    }

    vec![
        ReviewSection {
            step: Step::Identity,
            title: Step::Identity.title(),
            rows: identity,
        },
        ReviewSection {
            step: Step::Personal,
            title: Step::Personal.title(),
            rows: personal,
        },
        ReviewSection {
            step: Step::Category,
            title: Step::Category.title(),
            rows: category,
        },
        ReviewSection {
            step: Step::Details,
            title: Step::Details.title(),
            rows: details,
        },
    ]
}

/// Shown right after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuccessNotice {
    pub complaint_id: String,
    pub secret: String,
    pub track_link: String,
}

impl SuccessNotice {
    pub fn new(result: &SubmissionResult, settings: &Settings) -> Self {
        Self {
            complaint_id: result.complaint_id.clone(),
            secret: result.secret.clone(),
            track_link: settings.track_link(&result.complaint_id, &result.secret),
        }
    }
}

/// `18 October 2026, 09:05 PM` style timestamp used on receipts.
pub fn format_receipt_date(at: DateTime<Utc>) -> String {
    at.format("%-d %B %Y, %I:%M %p").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub university: &'static str,
    pub complaint_id: String,
    pub secret: String,
    pub submitted_on: String,
    pub status: String,
    pub complainant: Vec<ReviewRow>,
    pub complaint: Vec<ReviewRow>,
    pub contact_email: &'static str,
    pub contact_phone: &'static str,
}

impl Receipt {
    pub fn new(result: &SubmissionResult, payload: &ComplaintPayload) -> Self {
        let complainant = vec![
            ReviewRow::new("Name", payload.full_name.as_str()),
            ReviewRow::new("University ID", payload.user_id.as_str()),
            ReviewRow::new("Email", payload.email.as_str()),
            ReviewRow::new("Phone", payload.phone.as_str()),
            ReviewRow::new("User Type", capitalize(&payload.user_type)),
        ];

        let mut complaint = vec![
            ReviewRow::new("Title", payload.title.as_str()),
            ReviewRow::new("Category", category_label(&payload.primary_category)),
        ];
        if !payload.sub_category.is_empty() {
            complaint.push(ReviewRow::new(
                "Sub-Category",
                subcategory_label(&payload.primary_category, &payload.sub_category),
            ));
        }
        complaint.push(ReviewRow::new("Urgency", capitalize(&payload.urgency)));
        complaint.push(ReviewRow::new("Description", payload.description.as_str()));

        Self {
            university: UNIVERSITY_NAME,
            complaint_id: result.complaint_id.clone(),
            secret: result.secret.clone(),
            submitted_on: format_receipt_date(payload.submitted_at),
            status: capitalize(&payload.status),
            complainant,
            complaint,
            contact_email: CONTACT_EMAIL,
            contact_phone: CONTACT_PHONE,
        }
    }
}
