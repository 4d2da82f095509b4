//! Headless controller for the complaint portal: the step wizard, its validators and view
//! models, and the transports that file a finished complaint.

pub mod api;
pub mod config;
pub mod files;
pub mod identifiers;
pub mod review;
pub mod taxonomy;
pub mod telemetry;
pub mod validation;
pub mod wizard;

pub use api::{
    ApiFailure, ComplaintApi, HttpComplaintApi, IssuedBy, LocalSecret, MissingComplaintApi,
    OfflineComplaintApi, SubmissionResult,
};
pub use config::{load_settings, load_settings_from, ConfigError, Settings};
pub use files::{Attachment, FilePolicy, FileRejection};
pub use telemetry::HostEnvironment;
pub use validation::{FormView, ValidationError};
pub use wizard::{
    InputError, NavButtons, OtpError, StepStatus, SubmissionState, SubmitError,
    WizardController,
};
