//! The five-step complaint wizard.
//!
//! [`WizardController`] owns every piece of form state. Front ends feed it input events and read
//! back what to show; which panels are visible and which fields are required is always derived
//! from the current answers, never stored.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Instant,
};

use chrono::{DateTime, Utc};
use shared::{
    domain::{
        ChoiceParseError, ComplaintLevel, ComplaintScope, FieldId, FieldKind, FieldValue,
        FileDescriptor, Panel, Step, Urgency, UserType, Visibility, TOTAL_STEPS,
    },
    error::{ApiError, ErrorCode},
    protocol::ComplaintPayload,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    api::{ApiFailure, ComplaintApi, SubmissionResult},
    config::Settings,
    files::{Attachment, FilePolicy, FileRejection},
    review::{build_review, Receipt, ReviewSection, SuccessNotice},
    taxonomy::{self, SubCategory},
    telemetry::{HostEnvironment, InteractionTracker},
    validation::{
        validate_field, validate_final, validate_otp_code, validate_phone, validate_step,
        FormView, ValidationError,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("{field} does not take {expected:?} input")]
    WrongKind { field: FieldId, expected: FieldKind },
    #[error(transparent)]
    Choice(#[from] ChoiceParseError),
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
    #[error("'{sub}' is not a sub-category of '{category}'")]
    UnknownSubCategory { category: String, sub: String },
}

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("SMS verification is not enabled")]
    SmsDisabled,
    #[error("Please send an OTP first")]
    NotSent,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiFailure),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("complaints can only be submitted from the review step")]
    NotAtReview,
    #[error("a submission is already in progress")]
    InFlight,
    #[error("this complaint has already been submitted")]
    AlreadySubmitted,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiFailure),
}

impl SubmitError {
    pub fn to_api_error(&self) -> ApiError {
        match self {
            SubmitError::Api(failure) => failure.to_api_error(),
            SubmitError::Validation(_) | SubmitError::NotAtReview => {
                ApiError::new(ErrorCode::Validation, self.to_string())
            }
            SubmitError::InFlight | SubmitError::AlreadySubmitted => {
                ApiError::new(ErrorCode::Busy, self.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Active,
    Completed,
    Pending,
}

/// Which navigation controls are shown for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavButtons {
    pub previous: bool,
    pub next: bool,
    pub submit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    InFlight,
    Submitted,
    Failed(String),
}

/// Everything a transport needs to file the complaint, taken out of the controller by
/// [`WizardController::begin_submit`].
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub payload: ComplaintPayload,
    pub attachments: Vec<Attachment>,
}

pub struct WizardController {
    settings: Arc<Settings>,
    policy: FilePolicy,
    current: Step,
    completed: BTreeSet<Step>,
    values: BTreeMap<FieldId, FieldValue>,
    uploaded: Vec<Attachment>,
    otp_sent: bool,
    otp_verified: bool,
    tracker: InteractionTracker,
    submission: SubmissionState,
    result: Option<SubmissionResult>,
    submitted_payload: Option<ComplaintPayload>,
}

impl FormView for WizardController {
    fn text(&self, field: FieldId) -> &str {
        self.values
            .get(&field)
            .and_then(FieldValue::as_text)
            .unwrap_or("")
    }

    fn flag(&self, field: FieldId) -> bool {
        self.values.get(&field).is_some_and(FieldValue::as_flag)
    }

    fn is_visible(&self, field: FieldId) -> bool {
        self.is_panel_visible(field.panel())
    }

    fn is_required(&self, field: FieldId) -> bool {
        if !self.is_visible(field) {
            return false;
        }
        match field.step() {
            Step::Personal => field.is_required_when_visible(),
            Step::Category => field.panel() != Panel::CourseDetails,
            Step::Review => matches!(field, FieldId::TermsAccept | FieldId::Captcha),
            Step::Identity | Step::Details => true,
        }
    }
}

impl WizardController {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            policy: FilePolicy::from_settings(&settings),
            settings,
            current: Step::Identity,
            completed: BTreeSet::new(),
            values: BTreeMap::new(),
            uploaded: Vec::new(),
            otp_sent: false,
            otp_verified: false,
            tracker: InteractionTracker::new(Utc::now(), Instant::now()),
            submission: SubmissionState::Idle,
            result: None,
            submitted_payload: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn current_step(&self) -> Step {
        self.current
    }

    pub fn step_status(&self, step: Step) -> StepStatus {
        if step == self.current {
            StepStatus::Active
        } else if self.completed.contains(&step) {
            StepStatus::Completed
        } else {
            StepStatus::Pending
        }
    }

    pub fn progress_percent(&self) -> u8 {
        let percent = u16::from(self.current.number()) * 100 / u16::from(TOTAL_STEPS);
        percent as u8
    }

    pub fn nav_buttons(&self) -> NavButtons {
        let last = self.current == Step::Review;
        NavButtons {
            previous: self.current != Step::Identity,
            next: !last,
            submit: last,
        }
    }

    fn choice<T: std::str::FromStr>(&self, field: FieldId) -> Option<T> {
        self.text(field).parse().ok()
    }

    pub fn user_type(&self) -> Option<UserType> {
        self.choice(FieldId::UserType)
    }

    pub fn complaint_scope(&self) -> Option<ComplaintScope> {
        self.choice(FieldId::ComplaintScope)
    }

    pub fn visibility(&self) -> Option<Visibility> {
        self.choice(FieldId::Visibility)
    }

    pub fn urgency(&self) -> Option<Urgency> {
        self.choice(FieldId::Urgency)
    }

    pub fn complaint_level(&self) -> Option<ComplaintLevel> {
        self.choice(FieldId::ComplaintLevel)
    }

    pub fn is_panel_visible(&self, panel: Panel) -> bool {
        match panel {
            Panel::Always => true,
            Panel::Student | Panel::Teacher | Panel::Staff => {
                self.user_type().map(Panel::for_user_type) == Some(panel)
            }
            Panel::GroupDetails => self
                .complaint_scope()
                .is_some_and(ComplaintScope::needs_group_details),
            Panel::SubCategory => taxonomy::category(self.text(FieldId::PrimaryCategory)).is_some(),
            Panel::CourseDetails => self.complaint_level() == Some(ComplaintLevel::Course),
        }
    }

    /// Options currently offered by the sub-category control.
    pub fn subcategory_options(&self) -> &'static [SubCategory] {
        taxonomy::subcategories(self.text(FieldId::PrimaryCategory)).unwrap_or(&[])
    }

    fn expect_kind(field: FieldId, expected: FieldKind) -> Result<(), InputError> {
        if field.kind() == expected {
            Ok(())
        } else {
            Err(InputError::WrongKind { field, expected })
        }
    }

    fn store(&mut self, field: FieldId, value: FieldValue) {
        self.tracker.record_field_edit(field, Instant::now());
        self.values.insert(field, value);
    }

    /// Sets a free-text input.
    pub fn set_text(&mut self, field: FieldId, value: impl Into<String>) -> Result<(), InputError> {
        Self::expect_kind(field, FieldKind::Text)?;
        let value = value.into();
        if field == FieldId::Phone && value != self.text(FieldId::Phone) && self.otp_sent {
            debug!("phone number changed, phone verification reset");
            self.otp_sent = false;
            self.otp_verified = false;
        }
        self.store(field, FieldValue::Text(value));
        Ok(())
    }

    /// Sets a checkbox. The SMS toggle goes through [`Self::toggle_sms`].
    pub fn set_flag(&mut self, field: FieldId, on: bool) -> Result<(), InputError> {
        Self::expect_kind(field, FieldKind::Flag)?;
        if field == FieldId::SmsVerification {
            self.toggle_sms(on);
        } else {
            self.store(field, FieldValue::Flag(on));
        }
        Ok(())
    }

    /// Selects an option of a choice control. An empty value clears the selection.
    pub fn select(&mut self, field: FieldId, raw: &str) -> Result<(), InputError> {
        Self::expect_kind(field, FieldKind::Choice)?;
        let raw = raw.trim();
        let canonical = if raw.is_empty() {
            String::new()
        } else {
            self.canonical_choice(field, raw)?
        };

        if field == FieldId::PrimaryCategory && canonical != self.text(FieldId::PrimaryCategory) {
            self.values.remove(&FieldId::SubCategory);
            debug!(category = %canonical, "sub-category list repopulated");
        }
        debug!(%field, value = %canonical, "selection changed");
        self.store(field, FieldValue::Text(canonical));
        Ok(())
    }

    fn canonical_choice(&self, field: FieldId, raw: &str) -> Result<String, InputError> {
        let canonical = match field {
            FieldId::UserType => raw.parse::<UserType>()?.as_str(),
            FieldId::ComplaintScope => raw.parse::<ComplaintScope>()?.as_str(),
            FieldId::Visibility => raw.parse::<Visibility>()?.as_str(),
            FieldId::Urgency => raw.parse::<Urgency>()?.as_str(),
            FieldId::ComplaintLevel => raw.parse::<ComplaintLevel>()?.as_str(),
            FieldId::PrimaryCategory => {
                taxonomy::category(raw)
                    .ok_or_else(|| InputError::UnknownCategory(raw.to_string()))?
                    .key
            }
            FieldId::SubCategory => {
                let category = self.text(FieldId::PrimaryCategory);
                self.subcategory_options()
                    .iter()
                    .find(|sub| sub.key == raw)
                    .ok_or_else(|| InputError::UnknownSubCategory {
                        category: category.to_string(),
                        sub: raw.to_string(),
                    })?
                    .key
            }
            _ => {
                return Err(InputError::WrongKind {
                    field,
                    expected: FieldKind::Choice,
                })
            }
        };
        Ok(canonical.to_string())
    }

    /// Behavioural counters, for hosts that forward raw click/key/mouse events.
    pub fn tracker_mut(&mut self) -> &mut InteractionTracker {
        &mut self.tracker
    }

    /// Inline message for one control, for hosts that validate on blur and re-check on input
    /// while the control is marked invalid.
    pub fn check_field(&self, field: FieldId) -> Result<(), ValidationError> {
        validate_field(field, self)
    }

    /// Validates the current step and moves to the next one.
    ///
    /// On failure nothing changes. At the review step this is a no-op.
    pub fn advance(&mut self) -> Result<Step, ValidationError> {
        let Some(next) = self.current.next() else {
            return Ok(self.current);
        };
        if let Err(err) = validate_step(self.current, &*self) {
            warn!(step = self.current.number(), error = %err, "step validation failed");
            return Err(err);
        }
        self.completed.insert(self.current);
        self.completed.remove(&next);
        info!(from = self.current.number(), to = next.number(), "advanced");
        self.current = next;
        Ok(next)
    }

    /// Moves back one step. Both the step being left and the one arrived at lose their
    /// completed mark.
    pub fn retreat(&mut self) -> Step {
        if let Some(previous) = self.current.previous() {
            self.completed.remove(&self.current);
            self.completed.remove(&previous);
            info!(from = self.current.number(), to = previous.number(), "went back");
            self.current = previous;
        }
        self.current
    }

    /// Jumps to a completed step or to any step before the current one. Returns false (and
    /// stays put) otherwise.
    pub fn jump_to(&mut self, step: Step) -> bool {
        if step == self.current {
            return true;
        }
        if !(self.completed.contains(&step) || step < self.current) {
            debug!(step = step.number(), "jump refused");
            return false;
        }
        info!(from = self.current.number(), to = step.number(), "jumped");
        self.current = step;
        true
    }

    /// Adds candidate files one by one. Rejected files are dropped and reported; the rest of the
    /// batch is still processed.
    pub fn handle_files(&mut self, candidates: Vec<Attachment>) -> Vec<FileRejection> {
        let mut rejected = Vec::new();
        for attachment in candidates {
            match self.policy.check(&attachment.descriptor, self.uploaded.len()) {
                Ok(()) => {
                    info!(
                        name = %attachment.name(),
                        size = attachment.descriptor.size_bytes,
                        "attachment added"
                    );
                    self.uploaded.push(attachment);
                }
                Err(rejection) => {
                    warn!(%rejection, "attachment rejected");
                    rejected.push(rejection);
                }
            }
        }
        rejected
    }

    /// Removes every attachment called `name` and returns how many went.
    pub fn remove_file(&mut self, name: &str) -> usize {
        let before = self.uploaded.len();
        self.uploaded.retain(|attachment| attachment.name() != name);
        before - self.uploaded.len()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.uploaded
    }

    pub fn attachment_descriptors(&self) -> Vec<FileDescriptor> {
        self.uploaded
            .iter()
            .map(|attachment| attachment.descriptor.clone())
            .collect()
    }

    pub fn sms_enabled(&self) -> bool {
        self.flag(FieldId::SmsVerification)
    }

    pub fn otp_sent(&self) -> bool {
        self.otp_sent
    }

    pub fn otp_verified(&self) -> bool {
        self.otp_verified
    }

    /// Turning SMS verification off forgets any code sent so far.
    pub fn toggle_sms(&mut self, on: bool) {
        self.store(FieldId::SmsVerification, FieldValue::Flag(on));
        if !on {
            self.otp_sent = false;
            self.otp_verified = false;
        }
    }

    pub async fn send_otp(&mut self, api: &dyn ComplaintApi) -> Result<(), OtpError> {
        if !self.sms_enabled() {
            return Err(OtpError::SmsDisabled);
        }
        let phone = self.text(FieldId::Phone).trim().to_string();
        validate_phone(&phone)?;
        api.send_otp(&phone).await?;
        info!("verification code sent");
        self.otp_sent = true;
        self.otp_verified = false;
        Ok(())
    }

    pub async fn verify_otp(&mut self, api: &dyn ComplaintApi, code: &str) -> Result<(), OtpError> {
        if !self.sms_enabled() {
            return Err(OtpError::SmsDisabled);
        }
        if !self.otp_sent {
            return Err(OtpError::NotSent);
        }
        let code = code.trim();
        validate_otp_code(code)?;
        let phone = self.text(FieldId::Phone).trim().to_string();
        if let Err(err) = api.verify_otp(&phone, code).await {
            warn!(error = %err, "phone verification failed");
            return Err(err.into());
        }
        info!("phone number verified");
        self.otp_verified = true;
        Ok(())
    }

    pub fn review(&self) -> Vec<ReviewSection> {
        build_review(self, &self.attachment_descriptors())
    }

    fn collected(&self, field: FieldId) -> String {
        if self.is_visible(field) {
            self.text(field).trim().to_string()
        } else {
            String::new()
        }
    }

    /// Serialises the visible answers plus telemetry. Answers left in hidden panels are dropped.
    pub fn collect_payload(
        &self,
        env: &HostEnvironment,
        submitted_at: DateTime<Utc>,
        now: Instant,
    ) -> ComplaintPayload {
        let department = [
            FieldId::Department,
            FieldId::TeacherDepartment,
            FieldId::StaffDepartment,
        ]
        .into_iter()
        .map(|field| self.collected(field))
        .find(|value| !value.is_empty())
        .unwrap_or_default();

        ComplaintPayload {
            user_type: self.collected(FieldId::UserType),
            complaint_scope: self.collected(FieldId::ComplaintScope),
            visibility: self.collected(FieldId::Visibility),
            full_name: self.collected(FieldId::FullName),
            user_id: self.collected(FieldId::UserId),
            email: self.collected(FieldId::Email),
            phone: self.collected(FieldId::Phone),
            alternate_phone: self.collected(FieldId::AlternatePhone),
            college: self.collected(FieldId::College),
            department,
            program: self.collected(FieldId::Program),
            batch: self.collected(FieldId::Batch),
            semester: self.collected(FieldId::Semester),
            designation: self.collected(FieldId::Designation),
            experience: self.collected(FieldId::Experience),
            staff_role: self.collected(FieldId::StaffRole),
            group_name: self.collected(FieldId::GroupName),
            group_size: self.collected(FieldId::GroupSize),
            group_members: self.collected(FieldId::GroupMembers),
            primary_category: self.collected(FieldId::PrimaryCategory),
            sub_category: self.collected(FieldId::SubCategory),
            complaint_level: self.collected(FieldId::ComplaintLevel),
            course_code: self.collected(FieldId::CourseCode),
            course_name: self.collected(FieldId::CourseName),
            faculty_name: self.collected(FieldId::FacultyName),
            title: self.collected(FieldId::Title),
            description: self.collected(FieldId::Description),
            urgency: self.collected(FieldId::Urgency),
            sms_verification_enabled: self.sms_enabled(),
            phone_verified: self.otp_verified,
            device_info: env.device_info(),
            connection_info: env.connection_info(),
            geolocation: env.geolocation,
            form_analytics: self.tracker.snapshot(submitted_at, now),
            user_agent: env.user_agent.clone(),
            submitted_at,
            status: "pending".to_string(),
        }
    }

    pub fn submission_state(&self) -> &SubmissionState {
        &self.submission
    }

    /// Runs every check and, if they pass, marks the submission in flight and hands out what
    /// the transport needs. Nothing here touches the network.
    pub fn begin_submit(&mut self, env: &HostEnvironment) -> Result<PendingSubmission, SubmitError> {
        match self.submission {
            SubmissionState::InFlight => return Err(SubmitError::InFlight),
            SubmissionState::Submitted => return Err(SubmitError::AlreadySubmitted),
            SubmissionState::Idle | SubmissionState::Failed(_) => {}
        }
        if self.current != Step::Review {
            return Err(SubmitError::NotAtReview);
        }

        // Earlier steps may have been edited through jumps since they were validated.
        for step in [Step::Identity, Step::Personal, Step::Category, Step::Details] {
            validate_step(step, &*self)?;
        }
        if let Err(err) = validate_final(&*self) {
            warn!(error = %err, "submission blocked");
            return Err(err.into());
        }

        let payload = self.collect_payload(env, Utc::now(), Instant::now());
        self.submission = SubmissionState::InFlight;
        info!(attachments = self.uploaded.len(), "submission started");
        Ok(PendingSubmission {
            payload,
            attachments: self.uploaded.clone(),
        })
    }

    /// Records the transport's answer for a submission started with [`Self::begin_submit`].
    pub fn finish_submit(
        &mut self,
        pending: PendingSubmission,
        outcome: Result<SubmissionResult, ApiFailure>,
    ) -> Result<SubmissionResult, SubmitError> {
        match outcome {
            Ok(result) => {
                info!(
                    complaint_id = %result.complaint_id,
                    issued_by = ?result.issued_by,
                    "complaint submitted"
                );
                self.submission = SubmissionState::Submitted;
                self.result = Some(result.clone());
                self.submitted_payload = Some(pending.payload);
                Ok(result)
            }
            Err(failure) => {
                warn!(error = %failure, "submission failed; staying on review step");
                self.submission = SubmissionState::Failed(failure.to_string());
                Err(failure.into())
            }
        }
    }

    pub async fn submit(
        &mut self,
        api: &dyn ComplaintApi,
        env: &HostEnvironment,
    ) -> Result<SubmissionResult, SubmitError> {
        let pending = self.begin_submit(env)?;
        let outcome = api.submit(&pending.payload, &pending.attachments).await;
        self.finish_submit(pending, outcome)
    }

    pub fn result(&self) -> Option<&SubmissionResult> {
        self.result.as_ref()
    }

    pub fn success_notice(&self) -> Option<SuccessNotice> {
        self.result
            .as_ref()
            .map(|result| SuccessNotice::new(result, &self.settings))
    }

    pub fn receipt(&self) -> Option<Receipt> {
        Some(Receipt::new(
            self.result.as_ref()?,
            self.submitted_payload.as_ref()?,
        ))
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
