use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{
    api::{IssuedBy, OfflineComplaintApi},
    config::{MIME_JPEG, MIME_PDF},
};

const MIB: u64 = 1024 * 1024;

#[derive(Default)]
struct CountingApi {
    submits: AtomicUsize,
    reject_with: Option<&'static str>,
}

#[async_trait]
impl ComplaintApi for CountingApi {
    async fn submit(
        &self,
        _payload: &ComplaintPayload,
        _attachments: &[Attachment],
    ) -> Result<SubmissionResult, ApiFailure> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        match self.reject_with {
            Some(message) => Err(ApiFailure::Transport(message.to_string())),
            None => Ok(SubmissionResult {
                complaint_id: "CMP-2026-000777".into(),
                secret: "246810".into(),
                issued_by: IssuedBy::Server,
            }),
        }
    }

    async fn send_otp(&self, _phone: &str) -> Result<(), ApiFailure> {
        Ok(())
    }

    async fn verify_otp(&self, _phone: &str, otp: &str) -> Result<(), ApiFailure> {
        if otp == "135790" {
            Ok(())
        } else {
            Err(ApiFailure::Rejected("Invalid OTP".into()))
        }
    }
}

fn wizard() -> WizardController {
    WizardController::new(Arc::new(Settings::default()))
}

fn fill_identity(wizard: &mut WizardController, user_type: &str, scope: &str) {
    wizard.select(FieldId::UserType, user_type).expect("user type");
    wizard.select(FieldId::ComplaintScope, scope).expect("scope");
    wizard.select(FieldId::Visibility, "named").expect("visibility");
}

fn fill_student_personal(wizard: &mut WizardController) {
    for (field, value) in [
        (FieldId::FullName, "Asha Kumari"),
        (FieldId::UserId, "PPU2024001"),
        (FieldId::Email, "asha@ppu.ac.in"),
        (FieldId::Phone, "+91 9876543210"),
        (FieldId::College, "Science College"),
        (FieldId::Department, "Physics"),
        (FieldId::Program, "BSc"),
        (FieldId::Batch, "2024"),
        (FieldId::Semester, "3"),
    ] {
        wizard.set_text(field, value).expect("text");
    }
}

fn fill_category(wizard: &mut WizardController) {
    wizard
        .select(FieldId::PrimaryCategory, "infrastructure")
        .expect("category");
    wizard
        .select(FieldId::SubCategory, "library_issues")
        .expect("sub-category");
    wizard
        .select(FieldId::ComplaintLevel, "college")
        .expect("level");
}

fn fill_details(wizard: &mut WizardController) {
    wizard
        .set_text(FieldId::Title, "Library closes too early")
        .expect("title");
    wizard
        .set_text(
            FieldId::Description,
            "The central library closes at five which leaves no time to study after labs.",
        )
        .expect("description");
    wizard.select(FieldId::Urgency, "medium").expect("urgency");
}

fn at_review() -> WizardController {
    let mut wizard = wizard();
    fill_identity(&mut wizard, "student", "individual");
    wizard.advance().expect("step 1");
    fill_student_personal(&mut wizard);
    wizard.advance().expect("step 2");
    fill_category(&mut wizard);
    wizard.advance().expect("step 3");
    fill_details(&mut wizard);
    wizard.advance().expect("step 4");
    assert_eq!(wizard.current_step(), Step::Review);
    wizard
}

fn accept_terms(wizard: &mut WizardController) {
    wizard.set_flag(FieldId::TermsAccept, true).expect("terms");
    wizard.set_flag(FieldId::Captcha, true).expect("captcha");
}

#[test]
fn starts_on_first_step_with_only_next_shown() {
    let wizard = wizard();
    assert_eq!(wizard.current_step(), Step::Identity);
    assert_eq!(wizard.progress_percent(), 20);
    assert_eq!(
        wizard.nav_buttons(),
        NavButtons {
            previous: false,
            next: true,
            submit: false
        }
    );
    assert_eq!(wizard.step_status(Step::Identity), StepStatus::Active);
    assert_eq!(wizard.step_status(Step::Personal), StepStatus::Pending);
}

#[test]
fn failed_validation_never_moves_forward() {
    let mut wizard = wizard();
    assert_eq!(wizard.advance(), Err(ValidationError::MissingUserType));
    assert_eq!(wizard.current_step(), Step::Identity);

    fill_identity(&mut wizard, "student", "individual");
    wizard.advance().expect("identity passes");
    assert_eq!(
        wizard.advance(),
        Err(ValidationError::MissingField(FieldId::FullName))
    );
    assert_eq!(wizard.current_step(), Step::Personal);
    assert_eq!(wizard.step_status(Step::Identity), StepStatus::Completed);
}

#[test]
fn student_panel_alone_is_required_for_students() {
    let mut wizard = wizard();
    fill_identity(&mut wizard, "student", "individual");
    assert_eq!(wizard.advance(), Ok(Step::Personal));

    assert!(wizard.is_required(FieldId::College));
    assert!(!wizard.is_visible(FieldId::TeacherDepartment));
    assert!(!wizard.is_required(FieldId::TeacherDepartment));
    assert!(!wizard.is_required(FieldId::StaffRole));
    assert!(!wizard.is_required(FieldId::GroupName));
    assert!(!wizard.is_required(FieldId::AlternatePhone));

    fill_student_personal(&mut wizard);
    assert_eq!(wizard.advance(), Ok(Step::Category));
}

#[test]
fn switching_user_type_swaps_required_panel() {
    let mut wizard = wizard();
    fill_identity(&mut wizard, "student", "individual");
    wizard.select(FieldId::UserType, "teacher").expect("teacher");

    assert!(!wizard.is_required(FieldId::College));
    assert!(wizard.is_required(FieldId::TeacherDepartment));
    assert!(wizard.is_required(FieldId::Designation));
    assert!(wizard.is_visible(FieldId::Experience));
    assert!(!wizard.is_required(FieldId::Experience));
}

#[test]
fn group_scopes_reveal_and_require_group_details() {
    let mut wizard = wizard();
    fill_identity(&mut wizard, "staff", "group");
    assert!(wizard.is_required(FieldId::GroupMembers));

    wizard
        .select(FieldId::ComplaintScope, "department")
        .expect("department");
    assert!(wizard.is_visible(FieldId::GroupName));

    wizard
        .select(FieldId::ComplaintScope, "individual")
        .expect("individual");
    assert!(!wizard.is_visible(FieldId::GroupName));
    assert!(!wizard.is_required(FieldId::GroupName));
}

#[test]
fn primary_category_populates_subcategories() {
    let mut wizard = wizard();
    assert!(!wizard.is_visible(FieldId::SubCategory));
    assert!(wizard.subcategory_options().is_empty());

    wizard
        .select(FieldId::PrimaryCategory, "academic_issues")
        .expect("academic");
    assert!(wizard.is_visible(FieldId::SubCategory));
    assert_eq!(wizard.subcategory_options().len(), 6);
    wizard
        .select(FieldId::SubCategory, "teaching_quality")
        .expect("sub");

    wizard
        .select(FieldId::PrimaryCategory, "other")
        .expect("other");
    let keys: Vec<_> = wizard.subcategory_options().iter().map(|s| s.key).collect();
    assert_eq!(keys, ["general_feedback", "suggestions"]);
    assert_eq!(wizard.text(FieldId::SubCategory), "");
}

#[test]
fn subcategory_must_belong_to_selected_category() {
    let mut wizard = wizard();
    wizard
        .select(FieldId::PrimaryCategory, "other")
        .expect("other");
    assert_eq!(
        wizard.select(FieldId::SubCategory, "teaching_quality"),
        Err(InputError::UnknownSubCategory {
            category: "other".into(),
            sub: "teaching_quality".into()
        })
    );
    assert!(matches!(
        wizard.select(FieldId::PrimaryCategory, "weather"),
        Err(InputError::UnknownCategory(_))
    ));
}

#[test]
fn inputs_are_checked_against_control_kind() {
    let mut wizard = wizard();
    assert!(matches!(
        wizard.set_text(FieldId::UserType, "student"),
        Err(InputError::WrongKind { .. })
    ));
    assert!(matches!(
        wizard.select(FieldId::Title, "anything"),
        Err(InputError::WrongKind { .. })
    ));
    assert!(matches!(
        wizard.select(FieldId::Urgency, "whenever"),
        Err(InputError::Choice(_))
    ));
}

#[test]
fn course_level_reveals_optional_course_details() {
    let mut wizard = wizard();
    wizard.select(FieldId::ComplaintLevel, "course").expect("course");
    assert!(wizard.is_visible(FieldId::CourseCode));
    assert!(!wizard.is_required(FieldId::CourseCode));

    wizard
        .select(FieldId::ComplaintLevel, "university")
        .expect("university");
    assert!(!wizard.is_visible(FieldId::FacultyName));
}

#[test]
fn details_step_uses_character_counts() {
    let mut wizard = at_review();
    assert!(wizard.jump_to(Step::Details));

    wizard.set_text(FieldId::Title, "123456789").expect("title");
    assert_eq!(
        wizard.advance(),
        Err(ValidationError::TitleTooShort { min: 10, actual: 9 })
    );
    assert_eq!(wizard.current_step(), Step::Details);

    wizard.set_text(FieldId::Title, "1234567890").expect("title");
    wizard
        .set_text(FieldId::Description, "d".repeat(50))
        .expect("description");
    assert_eq!(wizard.advance(), Ok(Step::Review));
}

#[test]
fn jumps_go_back_freely_but_not_ahead() {
    let mut wizard = at_review();
    assert!(wizard.jump_to(Step::Personal));
    assert_eq!(wizard.current_step(), Step::Personal);

    // Steps 3 and 4 stay completed, so jumping forward to them is allowed.
    assert!(wizard.jump_to(Step::Details));
    assert!(!wizard.jump_to(Step::Review));
    assert_eq!(wizard.current_step(), Step::Details);
}

#[test]
fn going_back_uncommits_completion() {
    let mut wizard = wizard();
    fill_identity(&mut wizard, "student", "individual");
    wizard.advance().expect("step 1");
    assert_eq!(wizard.retreat(), Step::Identity);
    assert_eq!(wizard.step_status(Step::Identity), StepStatus::Active);
    assert_eq!(wizard.step_status(Step::Personal), StepStatus::Pending);
    assert!(!wizard.jump_to(Step::Personal));
    assert_eq!(wizard.retreat(), Step::Identity);
}

#[test]
fn review_step_shows_submit_instead_of_next() {
    let wizard = at_review();
    assert_eq!(wizard.progress_percent(), 100);
    assert_eq!(
        wizard.nav_buttons(),
        NavButtons {
            previous: true,
            next: false,
            submit: true
        }
    );
}

#[test]
fn oversize_files_are_dropped_without_aborting_batch() {
    let mut wizard = wizard();
    let rejected = wizard.handle_files(vec![
        Attachment::from_path(
            FileDescriptor::new("huge.pdf", 10 * MIB + 1, MIME_PDF),
            "/tmp/huge.pdf",
        ),
        Attachment::in_memory("notice.pdf", MIME_PDF, b"%PDF".to_vec()),
        Attachment::in_memory("clip.gif", "image/gif", vec![0; 16]),
        Attachment::in_memory("photo.jpg", MIME_JPEG, vec![0; 16]),
    ]);

    let names: Vec<_> = wizard.attachments().iter().map(Attachment::name).collect();
    assert_eq!(names, ["notice.pdf", "photo.jpg"]);
    assert_eq!(rejected.len(), 2);
    assert!(matches!(rejected[0], FileRejection::TooLarge { .. }));
    assert!(matches!(rejected[1], FileRejection::UnsupportedType { .. }));
}

#[test]
fn file_list_is_capped() {
    let mut wizard = wizard();
    let batch = (0..7)
        .map(|n| Attachment::in_memory(format!("page{n}.png"), "image/png", vec![1, 2, 3]))
        .collect();
    let rejected = wizard.handle_files(batch);
    assert_eq!(wizard.attachments().len(), 5);
    assert_eq!(rejected.len(), 2);
    assert!(matches!(rejected[0], FileRejection::TooMany { max: 5, .. }));
}

#[test]
fn removing_by_name_drops_every_match() {
    let mut wizard = wizard();
    wizard.handle_files(vec![
        Attachment::in_memory("scan.pdf", MIME_PDF, vec![1]),
        Attachment::in_memory("other.pdf", MIME_PDF, vec![2]),
        Attachment::in_memory("scan.pdf", MIME_PDF, vec![3]),
    ]);
    assert_eq!(wizard.remove_file("scan.pdf"), 2);
    assert_eq!(wizard.attachments().len(), 1);
    assert_eq!(wizard.remove_file("missing.pdf"), 0);
}

#[test]
fn review_groups_answers_by_step() {
    let mut wizard = at_review();
    wizard.handle_files(vec![Attachment::in_memory("a.pdf", MIME_PDF, vec![1])]);
    let sections = wizard.review();

    assert_eq!(sections.len(), 4);
    assert_eq!(sections[0].value("User Type"), Some("Student"));
    assert_eq!(sections[1].value("Email"), Some("asha@ppu.ac.in"));
    assert_eq!(sections[1].value("College"), Some("Science College"));
    assert_eq!(sections[1].value("Designation"), None);
    assert_eq!(sections[2].value("Primary"), Some("Infrastructure"));
    assert_eq!(sections[2].value("Scope"), Some("College Level"));
    assert_eq!(sections[3].value("Attachments"), Some("1 file(s) uploaded"));

    let target = sections[2].edit_target();
    assert!(wizard.jump_to(target));
    assert_eq!(wizard.current_step(), Step::Category);
}

#[tokio::test]
async fn submit_without_terms_makes_no_network_call() {
    let mut wizard = at_review();
    let api = CountingApi::default();

    let err = wizard
        .submit(&api, &HostEnvironment::default())
        .await
        .expect_err("blocked");
    assert!(matches!(
        err,
        SubmitError::Validation(ValidationError::TermsNotAccepted)
    ));
    assert_eq!(api.submits.load(Ordering::SeqCst), 0);

    wizard.set_flag(FieldId::TermsAccept, true).expect("terms");
    let err = wizard
        .submit(&api, &HostEnvironment::default())
        .await
        .expect_err("bot check");
    assert!(matches!(
        err,
        SubmitError::Validation(ValidationError::BotCheckMissing)
    ));
    assert_eq!(api.submits.load(Ordering::SeqCst), 0);
    assert_eq!(wizard.submission_state(), &SubmissionState::Idle);
}

#[tokio::test]
async fn submit_is_only_available_on_review_step() {
    let mut wizard = wizard();
    let api = CountingApi::default();
    let err = wizard
        .submit(&api, &HostEnvironment::default())
        .await
        .expect_err("not at review");
    assert!(matches!(err, SubmitError::NotAtReview));
    assert_eq!(err.to_api_error().code, ErrorCode::Validation);
}

#[tokio::test]
async fn stale_earlier_step_blocks_submit() {
    let mut wizard = at_review();
    accept_terms(&mut wizard);
    assert!(wizard.jump_to(Step::Personal));
    wizard.set_text(FieldId::Email, "not-an-email").expect("email");
    assert!(wizard.jump_to(Step::Details));
    wizard.advance().expect("details still valid");

    let api = CountingApi::default();
    let err = wizard
        .submit(&api, &HostEnvironment::default())
        .await
        .expect_err("stale email");
    assert!(matches!(
        err,
        SubmitError::Validation(ValidationError::InvalidEmail)
    ));
    assert_eq!(api.submits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_submit_exposes_notice_and_receipt() {
    let mut wizard = at_review();
    accept_terms(&mut wizard);
    let api = CountingApi::default();

    let result = wizard
        .submit(&api, &HostEnvironment::default())
        .await
        .expect("submitted");
    assert_eq!(result.complaint_id, "CMP-2026-000777");
    assert_eq!(wizard.submission_state(), &SubmissionState::Submitted);

    let notice = wizard.success_notice().expect("notice");
    assert_eq!(
        notice.track_link,
        "track-complaint.html?id=CMP-2026-000777&pin=246810"
    );
    let receipt = wizard.receipt().expect("receipt");
    assert_eq!(receipt.status, "Pending");
    assert_eq!(receipt.complaint_id, "CMP-2026-000777");

    let again = wizard
        .submit(&api, &HostEnvironment::default())
        .await
        .expect_err("already submitted");
    assert!(matches!(again, SubmitError::AlreadySubmitted));
    assert_eq!(api.submits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_submit_stays_on_review_for_retry() {
    let mut wizard = at_review();
    accept_terms(&mut wizard);
    let failing = CountingApi {
        reject_with: Some("connection reset"),
        ..CountingApi::default()
    };

    let err = wizard
        .submit(&failing, &HostEnvironment::default())
        .await
        .expect_err("network down");
    assert!(matches!(err, SubmitError::Api(ApiFailure::Transport(_))));
    assert_eq!(wizard.current_step(), Step::Review);
    assert!(matches!(wizard.submission_state(), SubmissionState::Failed(_)));
    assert!(wizard.receipt().is_none());

    let working = CountingApi::default();
    wizard
        .submit(&working, &HostEnvironment::default())
        .await
        .expect("retry");
    assert_eq!(wizard.submission_state(), &SubmissionState::Submitted);
}

#[test]
fn second_submit_while_in_flight_is_rejected() {
    let mut wizard = at_review();
    accept_terms(&mut wizard);
    let pending = wizard
        .begin_submit(&HostEnvironment::default())
        .expect("first");
    assert!(matches!(
        wizard.begin_submit(&HostEnvironment::default()),
        Err(SubmitError::InFlight)
    ));
    assert_eq!(pending.payload.status, "pending");

    let result = SubmissionResult {
        complaint_id: "CMP-2026-000001".into(),
        secret: "123456".into(),
        issued_by: IssuedBy::Local,
    };
    wizard
        .finish_submit(pending, Ok(result))
        .expect("finished");
    assert_eq!(wizard.submission_state(), &SubmissionState::Submitted);
}

#[test]
fn payload_keeps_visible_answers_and_derives_department() {
    let mut wizard = wizard();
    fill_identity(&mut wizard, "student", "individual");
    fill_student_personal(&mut wizard);
    wizard.select(FieldId::UserType, "teacher").expect("teacher");
    wizard
        .set_text(FieldId::TeacherDepartment, "Chemistry")
        .expect("dept");
    wizard
        .set_text(FieldId::GroupName, "Night owls")
        .expect("group");

    let env = HostEnvironment {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0".into(),
        ..HostEnvironment::default()
    };
    let payload = wizard.collect_payload(&env, Utc::now(), Instant::now());
    assert_eq!(payload.user_type, "teacher");
    assert_eq!(payload.department, "Chemistry");
    assert_eq!(payload.college, "");
    assert_eq!(payload.group_name, "");
    assert_eq!(payload.device_info.browser, "Firefox");
    assert_eq!(payload.device_info.os, "Linux");
    assert_eq!(payload.connection_info.connection_type, "unknown");
    assert_eq!(payload.status, "pending");
    assert!(payload.form_analytics.total_edits >= 12);
    assert!(payload
        .form_analytics
        .field_changes
        .iter()
        .any(|change| change.field == "userType" && change.changes_count == 2));
}

#[test]
fn host_events_reach_the_submitted_analytics() {
    let mut wizard = wizard();
    let now = Instant::now();
    wizard.tracker_mut().record_click(now);
    wizard.tracker_mut().record_paste(now);
    wizard.tracker_mut().record_visibility(true, now);

    let payload = wizard.collect_payload(&HostEnvironment::default(), Utc::now(), now);
    assert_eq!(payload.form_analytics.click_count, 1);
    assert_eq!(payload.form_analytics.copy_paste_count, 1);
    assert_eq!(payload.form_analytics.tab_switches, 1);
}

#[test]
fn inline_checks_follow_current_panels() {
    let mut wizard = wizard();
    fill_identity(&mut wizard, "student", "individual");
    assert_eq!(
        wizard.check_field(FieldId::College),
        Err(ValidationError::Required(FieldId::College))
    );
    // Staff fields are hidden for students.
    assert!(wizard.check_field(FieldId::StaffRole).is_ok());

    wizard.set_text(FieldId::Email, "asha.ppu.ac.in").expect("email");
    assert_eq!(
        wizard.check_field(FieldId::Email),
        Err(ValidationError::InvalidEmail)
    );
    wizard.set_text(FieldId::Email, "asha@ppu.ac.in").expect("email");
    assert!(wizard.check_field(FieldId::Email).is_ok());

    wizard.select(FieldId::UserType, "staff").expect("staff");
    assert!(wizard.check_field(FieldId::College).is_ok());
    assert_eq!(
        wizard.check_field(FieldId::StaffRole),
        Err(ValidationError::Required(FieldId::StaffRole))
    );
}

#[tokio::test]
async fn otp_requires_sms_toggle_and_valid_phone() {
    let mut wizard = wizard();
    let api = CountingApi::default();
    assert!(matches!(
        wizard.send_otp(&api).await,
        Err(OtpError::SmsDisabled)
    ));

    wizard.toggle_sms(true);
    wizard.set_text(FieldId::Phone, "12345").expect("phone");
    assert!(matches!(
        wizard.send_otp(&api).await,
        Err(OtpError::Validation(ValidationError::InvalidPhone))
    ));
    assert!(matches!(
        wizard.verify_otp(&api, "135790").await,
        Err(OtpError::NotSent)
    ));

    wizard
        .set_text(FieldId::Phone, "+91 9876543210")
        .expect("phone");
    wizard.send_otp(&api).await.expect("sent");
    assert!(matches!(
        wizard.verify_otp(&api, "12ab56").await,
        Err(OtpError::Validation(ValidationError::InvalidOtp))
    ));
    assert!(matches!(
        wizard.verify_otp(&api, "000000").await,
        Err(OtpError::Api(ApiFailure::Rejected(_)))
    ));
    assert!(!wizard.otp_verified());

    wizard.verify_otp(&api, "135790").await.expect("verified");
    assert!(wizard.otp_verified());
}

#[tokio::test]
async fn changing_phone_or_disabling_sms_resets_verification() {
    let mut wizard = wizard();
    let api = OfflineComplaintApi::new();
    let phone = "+91 9876543210";
    wizard.set_text(FieldId::Phone, phone).expect("phone");
    wizard.set_flag(FieldId::SmsVerification, true).expect("sms");

    wizard.send_otp(&api).await.expect("sent");
    let code = api.pending_otp(phone).await.expect("issued");
    wizard.verify_otp(&api, &code).await.expect("verified");
    assert!(wizard.otp_verified());

    wizard
        .set_text(FieldId::Phone, "+91 9123456780")
        .expect("phone");
    assert!(!wizard.otp_verified());
    assert!(!wizard.otp_sent());

    wizard.send_otp(&api).await.expect("sent again");
    wizard.toggle_sms(false);
    assert!(!wizard.otp_sent());
    assert!(!wizard.sms_enabled());
}
