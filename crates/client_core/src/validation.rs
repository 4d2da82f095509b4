//! Per-step and final-submit validation rules.
//!
//! Every rule returns the first failure it finds as a [`ValidationError`] whose `Display` is the
//! message shown to the person filling in the form.

use once_cell::sync::Lazy;
use regex::Regex;
use shared::domain::{FieldId, FieldKind, Step};
use thiserror::Error;

pub const TITLE_MIN_CHARS: usize = 10;
pub const TITLE_MAX_CHARS: usize = 150;
pub const DESCRIPTION_MIN_CHARS: usize = 50;
pub const PHONE_MIN_DIGITS: usize = 10;
pub const OTP_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static PHONE_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s+\-()]+$").expect("phone pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select your user type")]
    MissingUserType,
    #[error("Please select complaint scope (Individual/Group/Department)")]
    MissingComplaintScope,
    #[error("Please select complaint visibility")]
    MissingVisibility,
    #[error("Please fill in: {}", .0.label())]
    MissingField(FieldId),
    #[error("This field is required")]
    Required(FieldId),
    #[error("Please enter a valid university email")]
    InvalidEmail,
    #[error("Please enter a valid phone number")]
    InvalidPhone,
    #[error("Please select a primary category")]
    MissingPrimaryCategory,
    #[error("Please select a sub-category")]
    MissingSubCategory,
    #[error("Please select complaint scope")]
    MissingComplaintLevel,
    #[error("Complaint title must be at least {min} characters (currently {actual})")]
    TitleTooShort { min: usize, actual: usize },
    #[error("Complaint description must be at least {min} characters (currently {actual})")]
    DescriptionTooShort { min: usize, actual: usize },
    #[error("Please select urgency level")]
    MissingUrgency,
    #[error("Please accept the terms and conditions")]
    TermsNotAccepted,
    #[error("Please verify you are not a robot")]
    BotCheckMissing,
    #[error("Please enter a valid 6-digit OTP")]
    InvalidOtp,
}

impl ValidationError {
    /// Control that should receive focus after this failure, if any.
    pub fn field(&self) -> Option<FieldId> {
        match self {
            ValidationError::MissingUserType => Some(FieldId::UserType),
            ValidationError::MissingComplaintScope => Some(FieldId::ComplaintScope),
            ValidationError::MissingVisibility => Some(FieldId::Visibility),
            ValidationError::MissingField(field) | ValidationError::Required(field) => {
                Some(*field)
            }
            ValidationError::InvalidEmail => Some(FieldId::Email),
            ValidationError::InvalidPhone => Some(FieldId::Phone),
            ValidationError::MissingPrimaryCategory => Some(FieldId::PrimaryCategory),
            ValidationError::MissingSubCategory => Some(FieldId::SubCategory),
            ValidationError::MissingComplaintLevel => Some(FieldId::ComplaintLevel),
            ValidationError::TitleTooShort { .. } => Some(FieldId::Title),
            ValidationError::DescriptionTooShort { .. } => Some(FieldId::Description),
            ValidationError::MissingUrgency => Some(FieldId::Urgency),
            ValidationError::TermsNotAccepted => Some(FieldId::TermsAccept),
            ValidationError::BotCheckMissing => Some(FieldId::Captcha),
            ValidationError::InvalidOtp => None,
        }
    }
}

/// Read access to the form as currently displayed.
pub trait FormView {
    fn text(&self, field: FieldId) -> &str;
    fn flag(&self, field: FieldId) -> bool;
    fn is_visible(&self, field: FieldId) -> bool;
    fn is_required(&self, field: FieldId) -> bool;
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if PHONE_CHARS_RE.is_match(phone.trim()) && digits >= PHONE_MIN_DIGITS {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

pub fn validate_otp_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == OTP_LEN && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidOtp)
    }
}

/// Inline check for a single control, as run when it loses focus.
///
/// Hidden controls and flags always pass; blank optional text passes too.
pub fn validate_field(field: FieldId, view: &impl FormView) -> Result<(), ValidationError> {
    if !view.is_visible(field) || field.kind() == FieldKind::Flag {
        return Ok(());
    }
    let value = view.text(field).trim();
    if value.is_empty() {
        return if view.is_required(field) {
            Err(ValidationError::Required(field))
        } else {
            Ok(())
        };
    }
    match field {
        FieldId::Email => validate_email(value),
        FieldId::Phone | FieldId::AlternatePhone => validate_phone(value),
        _ => Ok(()),
    }
}

/// Entry rules for leaving `step` forwards. The review step has none.
pub fn validate_step(step: Step, view: &impl FormView) -> Result<(), ValidationError> {
    match step {
        Step::Identity => validate_identity(view),
        Step::Personal => validate_personal(view),
        Step::Category => validate_category(view),
        Step::Details => validate_details(view),
        Step::Review => Ok(()),
    }
}

/// Checks that only apply when the complaint is actually submitted.
pub fn validate_final(view: &impl FormView) -> Result<(), ValidationError> {
    if !view.flag(FieldId::TermsAccept) {
        return Err(ValidationError::TermsNotAccepted);
    }
    if !view.flag(FieldId::Captcha) {
        return Err(ValidationError::BotCheckMissing);
    }
    Ok(())
}

fn is_blank(view: &impl FormView, field: FieldId) -> bool {
    view.text(field).trim().is_empty()
}

fn validate_identity(view: &impl FormView) -> Result<(), ValidationError> {
    if is_blank(view, FieldId::UserType) {
        return Err(ValidationError::MissingUserType);
    }
    if is_blank(view, FieldId::ComplaintScope) {
        return Err(ValidationError::MissingComplaintScope);
    }
    if is_blank(view, FieldId::Visibility) {
        return Err(ValidationError::MissingVisibility);
    }
    Ok(())
}

fn validate_personal(view: &impl FormView) -> Result<(), ValidationError> {
    let missing = FieldId::ALL
        .iter()
        .copied()
        .filter(|field| field.step() == Step::Personal)
        .filter(|field| view.is_visible(*field) && view.is_required(*field))
        .find(|field| is_blank(view, *field));
    if let Some(field) = missing {
        return Err(ValidationError::MissingField(field));
    }

    validate_email(view.text(FieldId::Email))?;
    validate_phone(view.text(FieldId::Phone))?;
    Ok(())
}

fn validate_category(view: &impl FormView) -> Result<(), ValidationError> {
    if is_blank(view, FieldId::PrimaryCategory) {
        return Err(ValidationError::MissingPrimaryCategory);
    }
    if view.is_visible(FieldId::SubCategory) && is_blank(view, FieldId::SubCategory) {
        return Err(ValidationError::MissingSubCategory);
    }
    if is_blank(view, FieldId::ComplaintLevel) {
        return Err(ValidationError::MissingComplaintLevel);
    }
    Ok(())
}

fn validate_details(view: &impl FormView) -> Result<(), ValidationError> {
    let title = view.text(FieldId::Title);
    let title_len = title.chars().count();
    if title.trim().is_empty() || title_len < TITLE_MIN_CHARS {
        return Err(ValidationError::TitleTooShort {
            min: TITLE_MIN_CHARS,
            actual: title_len,
        });
    }

    let description = view.text(FieldId::Description);
    let description_len = description.chars().count();
    if description.trim().is_empty() || description_len < DESCRIPTION_MIN_CHARS {
        return Err(ValidationError::DescriptionTooShort {
            min: DESCRIPTION_MIN_CHARS,
            actual: description_len,
        });
    }

    if is_blank(view, FieldId::Urgency) {
        return Err(ValidationError::MissingUrgency);
    }
    Ok(())
}

pub fn title_counter(title: &str) -> String {
    format!("{}/{TITLE_MAX_CHARS} characters", title.chars().count())
}

pub fn description_counter(description: &str) -> String {
    let count = description.chars().count();
    if count < DESCRIPTION_MIN_CHARS {
        format!("{count} characters (minimum {DESCRIPTION_MIN_CHARS} required)")
    } else {
        format!("{count} characters ✓")
    }
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
