//! Static two-level complaint taxonomy.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubCategory {
    pub key: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub key: &'static str,
    pub label: &'static str,
    pub subcategories: &'static [SubCategory],
}

macro_rules! subs {
    ($($key:literal => $label:literal),+ $(,)?) => {
        &[$(SubCategory { key: $key, label: $label }),+]
    };
}

static CATEGORIES: &[Category] = &[
    Category {
        key: "academic_issues",
        label: "Academic Issues",
        subcategories: subs![
            "teaching_quality" => "Teaching Quality",
            "course_content" => "Course Content",
            "examination_grading" => "Examination & Grading",
            "assignment_issues" => "Assignment Issues",
            "attendance_disputes" => "Attendance Disputes",
            "academic_resources" => "Academic Resources",
        ],
    },
    Category {
        key: "infrastructure",
        label: "Infrastructure",
        subcategories: subs![
            "classroom_issues" => "Classroom Issues",
            "laboratory_issues" => "Laboratory Issues",
            "library_issues" => "Library Issues",
            "hostel_issues" => "Hostel Issues",
            "canteen_cafeteria" => "Canteen/Cafeteria",
            "sports_facilities" => "Sports Facilities",
            "it_internet" => "IT/Internet",
        ],
    },
    Category {
        key: "administrative",
        label: "Administrative",
        subcategories: subs![
            "fee_related" => "Fee Related",
            "documentation" => "Documentation",
            "admission_registration" => "Admission/Registration",
            "scholarship" => "Scholarship",
            "timetable_issues" => "Timetable Issues",
        ],
    },
    Category {
        key: "harassment_safety",
        label: "Harassment & Safety",
        subcategories: subs![
            "ragging" => "Ragging",
            "bullying" => "Bullying",
            "discrimination" => "Discrimination",
            "sexual_harassment" => "Sexual Harassment",
            "safety_concerns" => "Safety Concerns",
        ],
    },
    Category {
        key: "student_conduct",
        label: "Student Conduct",
        subcategories: subs![
            "peer_issues" => "Peer Issues",
            "group_project_conflicts" => "Group Project Conflicts",
            "disciplinary_concerns" => "Disciplinary Concerns",
        ],
    },
    Category {
        key: "other",
        label: "Other",
        subcategories: subs![
            "general_feedback" => "General Feedback",
            "suggestions" => "Suggestions",
        ],
    },
];

pub fn categories() -> &'static [Category] {
    CATEGORIES
}

pub fn category(key: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|category| category.key == key)
}

/// Ordered subcategories of a primary category, `None` for an unknown key.
pub fn subcategories(category_key: &str) -> Option<&'static [SubCategory]> {
    category(category_key).map(|category| category.subcategories)
}

pub fn label_for(category_key: &str, sub_key: &str) -> Option<&'static str> {
    subcategories(category_key)?
        .iter()
        .find(|sub| sub.key == sub_key)
        .map(|sub| sub.label)
}
