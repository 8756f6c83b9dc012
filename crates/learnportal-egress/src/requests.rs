//! Parameters of the business operations
//!
//! Filters become query parameters; the other types are JSON bodies. None of
//! them carry the tenant id, which is injected on dispatch.

use serde::{Deserialize, Serialize};

/// Course catalog filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFilters {
    pub category: Option<String>,
    pub course_type: Option<String>,
    pub search: Option<String>,
}

impl CourseFilters {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Default::default()
        }
    }
}

/// Employee directory filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeFilters {
    pub department: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub user_id: String,
    pub course_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLevelUpdate {
    pub user_id: String,
    pub skill_id: String,
    pub current_level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorshipRequest {
    pub mentee_id: String,
    pub mentor_id: String,
    pub focus_areas: Vec<String>,
}

/// Single training assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub employee_id: String,
    pub course_id: String,
    pub due_date: String,
    pub priority: String,
}

/// One course assigned to many users at once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignment {
    pub course_id: String,
    pub user_ids: Vec<String>,
    pub due_date: String,
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSkillRequirement {
    pub skill_id: String,
    pub required_level: u32,
}
