//! Backend domains
//!
//! Each domain is an independently deployed service with its own base URL.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical resource domain a business operation is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendDomain {
    Course,
    Enrollment,
    Certification,
    Skill,
    Assignment,
    Project,
    EmployeeSync,
}

impl BackendDomain {
    /// Every domain, in routing-table order.
    pub const ALL: [BackendDomain; 7] = [
        BackendDomain::Course,
        BackendDomain::Enrollment,
        BackendDomain::Certification,
        BackendDomain::Skill,
        BackendDomain::Assignment,
        BackendDomain::Project,
        BackendDomain::EmployeeSync,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendDomain::Course => "course",
            BackendDomain::Enrollment => "enrollment",
            BackendDomain::Certification => "certification",
            BackendDomain::Skill => "skill",
            BackendDomain::Assignment => "assignment",
            BackendDomain::Project => "project",
            BackendDomain::EmployeeSync => "employee_sync",
        }
    }
}

impl fmt::Display for BackendDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_names_are_unique() {
        let mut names: Vec<&str> = BackendDomain::ALL.iter().map(|d| d.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), BackendDomain::ALL.len());
        assert_eq!(BackendDomain::EmployeeSync.to_string(), "employee_sync");
    }

    #[test]
    fn test_domain_serde_snake_case() {
        let json = serde_json::to_string(&BackendDomain::EmployeeSync).unwrap();
        assert_eq!(json, "\"employee_sync\"");
    }
}
