use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TOTAL_STEPS: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ChoiceParseError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! choice_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ChoiceParseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim() {
                    $($wire => Ok($name::$variant),)+
                    other => Err(ChoiceParseError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice_enum!(UserType, "user type", {
    Student => "student",
    Teacher => "teacher",
    Staff => "staff",
});

choice_enum!(ComplaintScope, "complaint scope", {
    Individual => "individual",
    Group => "group",
    Department => "department",
});

choice_enum!(Visibility, "visibility", {
    Named => "named",
    Anonymous => "anonymous",
});

choice_enum!(Urgency, "urgency", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

choice_enum!(ComplaintLevel, "complaint level", {
    Course => "course",
    Department => "department",
    College => "college",
    University => "university",
});

impl ComplaintLevel {
    pub fn label(self) -> &'static str {
        match self {
            ComplaintLevel::Course => "Course Level",
            ComplaintLevel::Department => "Department Level",
            ComplaintLevel::College => "College Level",
            ComplaintLevel::University => "University Level",
        }
    }
}

impl ComplaintScope {
    pub fn needs_group_details(self) -> bool {
        matches!(self, ComplaintScope::Group | ComplaintScope::Department)
    }
}

/// One screen of the complaint wizard, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Identity,
    Personal,
    Category,
    Details,
    Review,
}

impl Step {
    pub const ALL: [Step; TOTAL_STEPS as usize] = [
        Step::Identity,
        Step::Personal,
        Step::Category,
        Step::Details,
        Step::Review,
    ];

    pub fn number(self) -> u8 {
        match self {
            Step::Identity => 1,
            Step::Personal => 2,
            Step::Category => 3,
            Step::Details => 4,
            Step::Review => 5,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(usize::from(number).checked_sub(1)?).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        Self::from_number(self.number().checked_sub(1)?)
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Identity => "User Information",
            Step::Personal => "Personal Details",
            Step::Category => "Complaint Category",
            Step::Details => "Complaint Details",
            Step::Review => "Review & Submit",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.title())
    }
}

/// Group of controls that is shown or hidden together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Always,
    Student,
    Teacher,
    Staff,
    GroupDetails,
    SubCategory,
    CourseDetails,
}

impl Panel {
    pub fn for_user_type(user_type: UserType) -> Self {
        match user_type {
            UserType::Student => Panel::Student,
            UserType::Teacher => Panel::Teacher,
            UserType::Staff => Panel::Staff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Choice,
    Text,
    Flag,
}

/// Logical control of the complaint form.
///
/// This is the single binding between controller logic and whatever surface renders the
/// form: validators, collectors and renderers address controls only through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldId {
    UserType,
    ComplaintScope,
    Visibility,
    FullName,
    UserId,
    Email,
    Phone,
    AlternatePhone,
    College,
    Department,
    Program,
    Batch,
    Semester,
    TeacherDepartment,
    Designation,
    Experience,
    StaffDepartment,
    StaffRole,
    GroupName,
    GroupSize,
    GroupMembers,
    PrimaryCategory,
    SubCategory,
    ComplaintLevel,
    CourseCode,
    CourseName,
    FacultyName,
    Title,
    Description,
    Urgency,
    SmsVerification,
    TermsAccept,
    Captcha,
}

impl FieldId {
    pub const ALL: &'static [FieldId] = &[
        FieldId::UserType,
        FieldId::ComplaintScope,
        FieldId::Visibility,
        FieldId::FullName,
        FieldId::UserId,
        FieldId::Email,
        FieldId::Phone,
        FieldId::AlternatePhone,
        FieldId::College,
        FieldId::Department,
        FieldId::Program,
        FieldId::Batch,
        FieldId::Semester,
        FieldId::TeacherDepartment,
        FieldId::Designation,
        FieldId::Experience,
        FieldId::StaffDepartment,
        FieldId::StaffRole,
        FieldId::GroupName,
        FieldId::GroupSize,
        FieldId::GroupMembers,
        FieldId::PrimaryCategory,
        FieldId::SubCategory,
        FieldId::ComplaintLevel,
        FieldId::CourseCode,
        FieldId::CourseName,
        FieldId::FacultyName,
        FieldId::Title,
        FieldId::Description,
        FieldId::Urgency,
        FieldId::SmsVerification,
        FieldId::TermsAccept,
        FieldId::Captcha,
    ];

    /// Name used in draft files and in the submitted JSON object.
    pub fn wire_name(self) -> &'static str {
        match self {
            FieldId::UserType => "userType",
            FieldId::ComplaintScope => "complaintScope",
            FieldId::Visibility => "visibility",
            FieldId::FullName => "fullName",
            FieldId::UserId => "userId",
            FieldId::Email => "email",
            FieldId::Phone => "phone",
            FieldId::AlternatePhone => "alternatePhone",
            FieldId::College => "college",
            FieldId::Department => "department",
            FieldId::Program => "program",
            FieldId::Batch => "batch",
            FieldId::Semester => "semester",
            FieldId::TeacherDepartment => "teacherDepartment",
            FieldId::Designation => "designation",
            FieldId::Experience => "experience",
            FieldId::StaffDepartment => "staffDepartment",
            FieldId::StaffRole => "staffRole",
            FieldId::GroupName => "groupName",
            FieldId::GroupSize => "groupSize",
            FieldId::GroupMembers => "groupMembers",
            FieldId::PrimaryCategory => "primaryCategory",
            FieldId::SubCategory => "subCategory",
            FieldId::ComplaintLevel => "complaintLevel",
            FieldId::CourseCode => "courseCode",
            FieldId::CourseName => "courseName",
            FieldId::FacultyName => "facultyName",
            FieldId::Title => "title",
            FieldId::Description => "description",
            FieldId::Urgency => "urgency",
            FieldId::SmsVerification => "smsVerification",
            FieldId::TermsAccept => "termsAccept",
            FieldId::Captcha => "captcha",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.wire_name() == name)
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldId::UserType => "User Type",
            FieldId::ComplaintScope => "Filing As",
            FieldId::Visibility => "Visibility",
            FieldId::FullName => "Full Name",
            FieldId::UserId => "University ID",
            FieldId::Email => "University Email",
            FieldId::Phone => "Phone Number",
            FieldId::AlternatePhone => "Alternate Phone",
            FieldId::College => "College",
            FieldId::Department => "Department",
            FieldId::Program => "Program",
            FieldId::Batch => "Batch",
            FieldId::Semester => "Semester",
            FieldId::TeacherDepartment => "Department",
            FieldId::Designation => "Designation",
            FieldId::Experience => "Experience (years)",
            FieldId::StaffDepartment => "Department/Section",
            FieldId::StaffRole => "Role",
            FieldId::GroupName => "Group Name",
            FieldId::GroupSize => "Number of Members",
            FieldId::GroupMembers => "Member Names/IDs",
            FieldId::PrimaryCategory => "Primary Category",
            FieldId::SubCategory => "Sub-Category",
            FieldId::ComplaintLevel => "Complaint Scope",
            FieldId::CourseCode => "Course Code",
            FieldId::CourseName => "Course Name",
            FieldId::FacultyName => "Faculty Name",
            FieldId::Title => "Complaint Title",
            FieldId::Description => "Complaint Description",
            FieldId::Urgency => "Urgency",
            FieldId::SmsVerification => "SMS Verification",
            FieldId::TermsAccept => "Terms Accepted",
            FieldId::Captcha => "Not a Robot",
        }
    }

    pub fn step(self) -> Step {
        match self {
            FieldId::UserType | FieldId::ComplaintScope | FieldId::Visibility => Step::Identity,
            FieldId::PrimaryCategory
            | FieldId::SubCategory
            | FieldId::ComplaintLevel
            | FieldId::CourseCode
            | FieldId::CourseName
            | FieldId::FacultyName => Step::Category,
            FieldId::Title | FieldId::Description | FieldId::Urgency => Step::Details,
            FieldId::SmsVerification | FieldId::TermsAccept | FieldId::Captcha => Step::Review,
            _ => Step::Personal,
        }
    }

    pub fn panel(self) -> Panel {
        match self {
            FieldId::College
            | FieldId::Department
            | FieldId::Program
            | FieldId::Batch
            | FieldId::Semester => Panel::Student,
            FieldId::TeacherDepartment | FieldId::Designation | FieldId::Experience => {
                Panel::Teacher
            }
            FieldId::StaffDepartment | FieldId::StaffRole => Panel::Staff,
            FieldId::GroupName | FieldId::GroupSize | FieldId::GroupMembers => Panel::GroupDetails,
            FieldId::SubCategory => Panel::SubCategory,
            FieldId::CourseCode | FieldId::CourseName | FieldId::FacultyName => {
                Panel::CourseDetails
            }
            _ => Panel::Always,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            FieldId::UserType
            | FieldId::ComplaintScope
            | FieldId::Visibility
            | FieldId::PrimaryCategory
            | FieldId::SubCategory
            | FieldId::ComplaintLevel
            | FieldId::Urgency => FieldKind::Choice,
            FieldId::SmsVerification | FieldId::TermsAccept | FieldId::Captcha => FieldKind::Flag,
            _ => FieldKind::Text,
        }
    }

    /// Text inputs on the personal-details screen that must be filled whenever their panel is
    /// on screen. Optional inputs never become required.
    pub fn is_required_when_visible(self) -> bool {
        self.step() == Step::Personal
            && !matches!(self, FieldId::AlternatePhone | FieldId::Experience)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Answer to one control. Numbers are read as their decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, from = "RawFieldValue")]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldValue {
    Flag(bool),
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl From<RawFieldValue> for FieldValue {
    fn from(raw: RawFieldValue) -> Self {
        match raw {
            RawFieldValue::Flag(on) => FieldValue::Flag(on),
            RawFieldValue::Text(text) => FieldValue::Text(text),
            RawFieldValue::Unsigned(n) => FieldValue::Text(n.to_string()),
            RawFieldValue::Signed(n) => FieldValue::Text(n.to_string()),
            RawFieldValue::Float(n) => FieldValue::Text(n.to_string()),
        }
    }
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> bool {
        matches!(self, FieldValue::Flag(true))
    }
}

/// Metadata of a candidate attachment, as reported by the host file picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, size_bytes: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            mime_type: mime_type.into(),
        }
    }
}
