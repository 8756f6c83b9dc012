//! Aggregated views that fan out to several backends at once
//!
//! Each section degrades on its own: a failing call is logged and replaced by
//! an empty fallback so the rest of the view still renders. A call that ends
//! the session fails the whole view.

use learnportal_egress::requests::CourseFilters;
use learnportal_egress::{LearningApi, or_fallback};
use serde_json::{Map, Value, json};

/// Personal dashboard for the signed-in user.
pub async fn dashboard(api: &LearningApi) -> anyhow::Result<Value> {
    let ctx = api.tenant_context()?;
    let user_id = ctx.user_id.as_str();
    let filters = CourseFilters::default();

    let (summary, courses, enrollments, assignments, certifications) = tokio::join!(
        api.get_dashboard(user_id),
        api.get_courses(&filters),
        api.get_enrollments(user_id, None),
        api.get_assignments(Some(user_id)),
        api.get_certifications(user_id),
    );

    let summary = or_fallback("dashboard", summary, json!({}))?;
    let courses = or_fallback("courses", courses, json!([]))?;
    let enrollments = or_fallback("enrollments", enrollments, json!([]))?;
    let assignments = or_fallback("assignments", assignments, json!([]))?;
    let certifications = or_fallback("certifications", certifications, json!([]))?;

    Ok(json!({
        "tenant": {
            "id": ctx.tenant_id,
            "name": ctx.display_name(),
        },
        "user": {
            "id": ctx.user_id,
            "email": ctx.user_email,
        },
        "summary": summary,
        "courses": courses,
        "enrollments": enrollments,
        "assignments": assignments,
        "certifications": certifications,
    }))
}

/// Project detail joined with its readiness score and risk assessment.
pub async fn project_readiness(api: &LearningApi, project_id: &str) -> anyhow::Result<Value> {
    api.tenant_context()?;

    let (project, readiness, risk) = tokio::join!(
        api.get_project_by_id(project_id),
        api.get_project_readiness_score(project_id),
        api.get_project_risk_assessment(project_id),
    );

    let readiness = or_fallback("readiness", readiness, Value::Null)?;
    let risk = or_fallback("risk assessment", risk, Value::Null)?;
    let project = or_fallback("project", project, json!({}))?;

    Ok(json!({
        "project": project,
        "readiness": merge_objects(readiness, risk),
    }))
}

/// Shallow merge of two JSON objects, keys from `overlay` win.
///
/// Non-object inputs are skipped; if neither is an object the result is null.
fn merge_objects(base: Value, overlay: Value) -> Value {
    let mut merged = Map::new();
    let mut any = false;
    for value in [base, overlay] {
        if let Value::Object(fields) = value {
            any = true;
            merged.extend(fields);
        }
    }
    if any { Value::Object(merged) } else { Value::Null }
}
