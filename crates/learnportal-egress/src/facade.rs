//! Typed business operations
//!
//! `LearningApi` has one method per operation the portal views need. Each
//! method only describes the call; routing, identity and tenant scoping
//! happen in the `RequestAugmentor`. Responses are passed through as decoded
//! JSON without normalization, and nothing is cached, so callers refetch
//! lists after a mutation.

use std::sync::Arc;

use learnportal_core::{LoginNavigator, SessionStore, TenantContext, TracingNavigator};
use serde_json::{Value, json};
use tracing::warn;

use crate::augmentor::{ApiRequest, RequestAugmentor};
use crate::client::HttpClientConfig;
use crate::requests::{
    BulkAssignment, CourseFilters, EmployeeFilters, EnrollmentRequest, MentorshipRequest,
    NewAssignment, NewProject, ProgressUpdate, ProjectSkillRequirement, SkillLevelUpdate,
};
use crate::router::EndpointMap;
use crate::{EgressError, Result};

use learnportal_core::BackendDomain::{
    Assignment, Certification, Course, EmployeeSync, Enrollment, Project, Skill,
};

/// Default external login address.
pub const DEFAULT_LOGIN_URL: &str = "http://localhost:3005/login";

/// Client configuration
#[derive(Debug, Clone)]
pub struct LearningApiConfig {
    /// Base URL of every backend service
    pub endpoints: EndpointMap,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,

    /// Where the user is sent when a backend answers 401
    pub login_url: String,
}

impl Default for LearningApiConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointMap::default(),
            client_config: HttpClientConfig::default(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }
}

impl LearningApiConfig {
    pub fn new(endpoints: EndpointMap) -> Self {
        Self {
            endpoints,
            ..Default::default()
        }
    }

    /// Set the login address
    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = login_url.into();
        self
    }

    /// Set the HTTP client configuration
    pub fn with_client_config(mut self, client_config: HttpClientConfig) -> Self {
        self.client_config = client_config;
        self
    }
}

/// Tenant-scoped client for the learning platform services
#[derive(Debug)]
pub struct LearningApi {
    augmentor: RequestAugmentor,
}

impl LearningApi {
    /// Create a client that logs login redirects instead of navigating.
    pub fn new(config: LearningApiConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        Self::with_navigator(config, store, Arc::new(TracingNavigator))
    }

    pub fn with_navigator(
        config: LearningApiConfig,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn LoginNavigator>,
    ) -> Result<Self> {
        let augmentor = RequestAugmentor::new(
            config.endpoints,
            &config.client_config,
            config.login_url,
            store,
            navigator,
        )?;
        Ok(Self { augmentor })
    }

    pub fn augmentor(&self) -> &RequestAugmentor {
        &self.augmentor
    }

    /// Tenant context of the current session.
    pub fn tenant_context(&self) -> Result<Arc<TenantContext>> {
        self.augmentor.tenant_context()
    }

    /// Clear the session. The caller handles navigation.
    pub fn logout(&self) -> Result<()> {
        self.augmentor.end_session()
    }

    async fn send(&self, request: ApiRequest) -> Result<Value> {
        self.augmentor.send(request).await
    }

    // Dashboard

    pub async fn get_dashboard(&self, user_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Course, ["dashboard"]).query("userId", user_id)).await
    }

    // Courses

    pub async fn get_courses(&self, filters: &CourseFilters) -> Result<Value> {
        let request = ApiRequest::get(Course, ["courses"])
            .query_opt("category", filters.category.clone())
            .query_opt("type", filters.course_type.clone())
            .query_opt("search", filters.search.clone());
        self.send(request).await
    }

    pub async fn get_course_by_id(&self, course_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Course, ["courses", course_id])).await
    }

    pub async fn get_mandatory_courses(&self) -> Result<Value> {
        self.send(ApiRequest::get(Course, ["courses", "mandatory"])).await
    }

    // Enrollments

    pub async fn get_enrollments(&self, user_id: &str, status: Option<&str>) -> Result<Value> {
        let request = ApiRequest::get(Enrollment, ["enrollments"])
            .query("userId", user_id)
            .query_opt("status", status);
        self.send(request).await
    }

    pub async fn enroll_in_course(&self, user_id: &str, course_id: &str) -> Result<Value> {
        let body = EnrollmentRequest {
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
        };
        self.send(ApiRequest::post(Enrollment, ["enrollments"]).json(&body)?).await
    }

    pub async fn update_enrollment_progress(
        &self,
        enrollment_id: &str,
        progress: f64,
    ) -> Result<Value> {
        let request = ApiRequest::put(Enrollment, ["enrollments", enrollment_id, "progress"])
            .json(&ProgressUpdate { progress })?;
        self.send(request).await
    }

    // Performance (served by the enrollment service)

    pub async fn get_user_performance(&self, user_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Enrollment, ["performance"]).query("userId", user_id)).await
    }

    pub async fn get_performance_data(&self) -> Result<Value> {
        self.send(ApiRequest::get(Enrollment, ["performance"])).await
    }

    pub async fn get_training_impact(&self) -> Result<Value> {
        self.send(ApiRequest::get(Enrollment, ["training-impact"])).await
    }

    // Certifications

    pub async fn get_certifications(&self, user_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Certification, ["certifications"]).query("userId", user_id)).await
    }

    pub async fn get_required_certifications(&self) -> Result<Value> {
        self.send(ApiRequest::get(Certification, ["certifications", "required"])).await
    }

    // Skills

    pub async fn get_user_skills(&self, user_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Skill, ["skills", "user"]).query("userId", user_id)).await
    }

    pub async fn get_skills_framework(&self) -> Result<Value> {
        self.send(ApiRequest::get(Skill, ["skills", "framework"])).await
    }

    pub async fn get_skills_gap_analysis(&self, user_id: Option<&str>) -> Result<Value> {
        self.send(ApiRequest::get(Skill, ["skills", "gap-analysis"]).query_opt("userId", user_id))
            .await
    }

    pub async fn update_user_skill(
        &self,
        user_id: &str,
        skill_id: &str,
        level: u32,
    ) -> Result<Value> {
        let body = SkillLevelUpdate {
            user_id: user_id.to_string(),
            skill_id: skill_id.to_string(),
            current_level: level,
        };
        self.send(ApiRequest::put(Skill, ["skills", "user"]).json(&body)?).await
    }

    // Mentorship (served by the skills service)

    pub async fn get_mentors(&self) -> Result<Value> {
        self.send(ApiRequest::get(Skill, ["mentors"])).await
    }

    pub async fn get_user_mentorships(&self, user_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Skill, ["mentorship"]).query("userId", user_id)).await
    }

    /// Ask a mentor for mentorship on behalf of the signed-in user.
    pub async fn request_mentorship(
        &self,
        mentor_id: &str,
        focus_areas: &[String],
    ) -> Result<Value> {
        let body = MentorshipRequest {
            mentee_id: self.tenant_context()?.user_id.clone(),
            mentor_id: mentor_id.to_string(),
            focus_areas: focus_areas.to_vec(),
        };
        self.send(ApiRequest::post(Skill, ["mentorship"]).json(&body)?).await
    }

    // Employees (employee-sync service)

    pub async fn get_employees(&self, filters: &EmployeeFilters) -> Result<Value> {
        let request = ApiRequest::get(EmployeeSync, ["employees"])
            .query_opt("department", filters.department.clone())
            .query_opt("status", filters.status.clone());
        self.send(request).await
    }

    pub async fn get_employee_by_id(&self, employee_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(EmployeeSync, ["employees", employee_id])).await
    }

    pub async fn get_employee_count(&self) -> Result<Value> {
        self.send(ApiRequest::get(EmployeeSync, ["employees", "count"])).await
    }

    pub async fn get_org_hierarchy(&self) -> Result<Value> {
        self.send(ApiRequest::get(EmployeeSync, ["org-structure"])).await
    }

    // Training compliance

    /// Assignments still pending completion.
    pub async fn get_compliance_status(&self) -> Result<Value> {
        self.send(ApiRequest::get(Assignment, ["assignments"]).query("status", "PENDING")).await
    }

    pub async fn get_compliance_by_course(&self) -> Result<Value> {
        self.send(ApiRequest::get(Assignment, ["assignments", "by-course"])).await
    }

    // Training assignments

    pub async fn get_assignments(&self, user_id: Option<&str>) -> Result<Value> {
        self.send(ApiRequest::get(Assignment, ["assignments"]).query_opt("userId", user_id)).await
    }

    pub async fn create_assignment(&self, assignment: &NewAssignment) -> Result<Value> {
        self.send(ApiRequest::post(Assignment, ["assignments"]).json(assignment)?).await
    }

    pub async fn bulk_assign_course(&self, assignment: &BulkAssignment) -> Result<Value> {
        self.send(ApiRequest::post(Assignment, ["assignments", "bulk"]).json(assignment)?).await
    }

    // Projects

    pub async fn get_projects(&self, status: Option<&str>) -> Result<Value> {
        self.send(ApiRequest::get(Project, ["projects"]).query_opt("status", status)).await
    }

    pub async fn get_project_by_id(&self, project_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Project, ["projects", project_id])).await
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Value> {
        self.send(ApiRequest::post(Project, ["projects"]).json(project)?).await
    }

    /// Partial update; `changes` must be a JSON object.
    pub async fn update_project(&self, project_id: &str, changes: Value) -> Result<Value> {
        if !changes.is_object() {
            return Err(EgressError::InvalidRequest(
                "Project changes must be a JSON object".to_string(),
            ));
        }
        self.send(ApiRequest::put(Project, ["projects", project_id]).body(changes)).await
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<Value> {
        self.send(ApiRequest::delete(Project, ["projects", project_id])).await
    }

    // Project skills, gaps and readiness

    pub async fn add_project_skill(
        &self,
        project_id: &str,
        requirement: &ProjectSkillRequirement,
    ) -> Result<Value> {
        let request =
            ApiRequest::post(Project, ["projects", project_id, "skills"]).json(requirement)?;
        self.send(request).await
    }

    pub async fn remove_project_skill(&self, project_id: &str, skill_id: &str) -> Result<Value> {
        self.send(ApiRequest::delete(Project, ["projects", project_id, "skills", skill_id])).await
    }

    pub async fn get_project_skills_map(&self, project_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Project, ["projects", project_id, "skills"])).await
    }

    pub async fn get_project_gap_analysis(&self, project_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Project, ["projects", project_id, "gap-analysis"])).await
    }

    /// Ask the project service to recompute the skill gaps.
    pub async fn analyze_project_gaps(&self, project_id: &str) -> Result<Value> {
        let request =
            ApiRequest::post(Project, ["projects", project_id, "analyze-gaps"]).body(json!({}));
        self.send(request).await
    }

    pub async fn get_project_training_assignments(&self, project_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Project, ["projects", project_id, "training-assignments"])).await
    }

    /// Assign training for every open gap on the project.
    pub async fn auto_assign_project_training(&self, project_id: &str) -> Result<Value> {
        let request = ApiRequest::post(Project, ["projects", project_id, "auto-assign-training"])
            .body(json!({}));
        self.send(request).await
    }

    pub async fn get_project_readiness_score(&self, project_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Project, ["projects", project_id, "readiness-score"])).await
    }

    pub async fn get_project_risk_assessment(&self, project_id: &str) -> Result<Value> {
        self.send(ApiRequest::get(Project, ["projects", project_id, "risk-assessment"])).await
    }
}

/// Per-section fallback for views that assemble several calls.
///
/// A failed call degrades to `fallback` (typically `[]` or `{}`) so the other
/// sections still render. Errors that end the session are returned instead:
/// once the session is gone the whole view is stale.
pub fn or_fallback(section: &str, result: Result<Value>, fallback: Value) -> Result<Value> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.ends_session() => Err(e),
        Err(e) => {
            warn!(section = section, error = %e, "Section unavailable, showing empty state");
            Ok(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnportal_core::{BackendDomain, MemorySessionStore};

    #[test]
    fn test_or_fallback() {
        let ok = or_fallback("courses", Ok(json!([{"id": "c1"}])), json!([])).unwrap();
        assert_eq!(ok, json!([{"id": "c1"}]));

        let failed = or_fallback("courses", Err(EgressError::Timeout(30)), json!([])).unwrap();
        assert_eq!(failed, json!([]));
    }

    #[test]
    fn test_or_fallback_keeps_session_errors() {
        let expired = EgressError::SessionExpired {
            login_url: DEFAULT_LOGIN_URL.to_string(),
        };
        let result = or_fallback("courses", Err(expired), json!([]));
        assert!(matches!(result, Err(EgressError::SessionExpired { .. })));

        let missing = EgressError::from(learnportal_core::Error::MissingSessionData(
            "tenantRealm".to_string(),
        ));
        let result = or_fallback("courses", Err(missing), json!([]));
        assert!(result.unwrap_err().is_missing_session());
    }

    #[test]
    fn test_config_builder() {
        let config = LearningApiConfig::default().with_login_url("https://sso.example.com/login");
        assert_eq!(config.login_url, "https://sso.example.com/login");
        assert_eq!(config.endpoints, EndpointMap::default());
    }

    #[test]
    fn test_new_rejects_invalid_endpoints() {
        let mut endpoints = EndpointMap::default();
        endpoints.set(BackendDomain::Assignment, "");
        let result = LearningApi::new(
            LearningApiConfig::new(endpoints),
            Arc::new(MemorySessionStore::new()),
        );
        assert!(matches!(result, Err(EgressError::Config(_))));
    }

    #[test]
    fn test_tenant_context_requires_session() {
        let api = LearningApi::new(
            LearningApiConfig::default(),
            Arc::new(MemorySessionStore::new()),
        )
        .unwrap();
        assert!(api.tenant_context().unwrap_err().is_missing_session());
    }
}
