//! Backend routing
//!
//! Maps each backend domain to the base URL of the service that owns it.

use learnportal_core::BackendDomain;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{EgressError, Result};

/// Base URL of every backend service.
///
/// One field per domain, so a domain without an address does not compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointMap {
    pub course: String,
    pub enrollment: String,
    pub certification: String,
    pub skill: String,
    pub assignment: String,
    pub project: String,
    pub employee_sync: String,
}

impl Default for EndpointMap {
    fn default() -> Self {
        Self {
            course: "http://localhost:8091/api/v1".to_string(),
            enrollment: "http://localhost:10092/api/v1".to_string(),
            certification: "http://localhost:10093/api/v1".to_string(),
            skill: "http://localhost:10094/api/v1".to_string(),
            assignment: "http://localhost:10095/api/v1".to_string(),
            project: "http://localhost:8096/api/v1".to_string(),
            employee_sync: "http://localhost:8097/api/v1".to_string(),
        }
    }
}

impl EndpointMap {
    /// Route every domain to the same base URL.
    pub fn uniform(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let mut map = Self::default();
        for domain in BackendDomain::ALL {
            map.set(domain, base_url.clone());
        }
        map
    }

    /// Base URL of the service that owns `domain`.
    pub fn resolve_base_url(&self, domain: BackendDomain) -> &str {
        match domain {
            BackendDomain::Course => &self.course,
            BackendDomain::Enrollment => &self.enrollment,
            BackendDomain::Certification => &self.certification,
            BackendDomain::Skill => &self.skill,
            BackendDomain::Assignment => &self.assignment,
            BackendDomain::Project => &self.project,
            BackendDomain::EmployeeSync => &self.employee_sync,
        }
    }

    /// Replace the base URL of one domain.
    pub fn set(&mut self, domain: BackendDomain, base_url: impl Into<String>) {
        let slot = match domain {
            BackendDomain::Course => &mut self.course,
            BackendDomain::Enrollment => &mut self.enrollment,
            BackendDomain::Certification => &mut self.certification,
            BackendDomain::Skill => &mut self.skill,
            BackendDomain::Assignment => &mut self.assignment,
            BackendDomain::Project => &mut self.project,
            BackendDomain::EmployeeSync => &mut self.employee_sync,
        };
        *slot = base_url.into();
    }

    /// Check that every domain has an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        for domain in BackendDomain::ALL {
            self.parse_base(domain)?;
        }
        Ok(())
    }

    /// Full URL for `segments` under the domain's base URL.
    ///
    /// Each segment is percent-encoded on its own, so ids containing `/`
    /// cannot escape their position in the path. Empty, `.` and `..`
    /// segments are rejected: the URL parser would drop or resolve them and
    /// retarget the call at a parent resource.
    pub fn url_for<S: AsRef<str>>(&self, domain: BackendDomain, segments: &[S]) -> Result<Url> {
        if let Some(segment) = segments
            .iter()
            .map(AsRef::as_ref)
            .find(|s| matches!(*s, "" | "." | ".."))
        {
            return Err(EgressError::InvalidRequest(format!(
                "Invalid path segment {:?} for {}",
                segment, domain
            )));
        }

        let mut url = self.parse_base(domain)?;
        url.path_segments_mut()
            .map_err(|_| {
                EgressError::Config(format!("Base URL for {} cannot carry a path", domain))
            })?
            .pop_if_empty()
            .extend(segments.iter().map(|s| s.as_ref()));
        Ok(url)
    }

    fn parse_base(&self, domain: BackendDomain) -> Result<Url> {
        let raw = self.resolve_base_url(domain).trim();
        if raw.is_empty() {
            return Err(EgressError::Config(format!(
                "No base URL configured for {}",
                domain
            )));
        }

        let url = Url::parse(raw).map_err(|e| {
            EgressError::Config(format!("Invalid base URL for {}: {}", domain, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(EgressError::Config(format!(
                "Base URL for {} must be http or https, got {}",
                domain,
                url.scheme()
            )));
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_domain_resolves() {
        let map = EndpointMap::default();
        for domain in BackendDomain::ALL {
            let first = map.resolve_base_url(domain);
            assert!(!first.is_empty());
            assert_eq!(first, map.resolve_base_url(domain));
        }
        assert!(map.validate().is_ok());
    }

    #[test]
    fn test_default_ports_are_distinct() {
        let map = EndpointMap::default();
        let mut urls: Vec<&str> = BackendDomain::ALL
            .iter()
            .map(|d| map.resolve_base_url(*d))
            .collect();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), BackendDomain::ALL.len());
    }

    #[test]
    fn test_set_overrides_single_domain() {
        let mut map = EndpointMap::default();
        map.set(BackendDomain::Project, "https://projects.internal/api/v1");
        assert_eq!(
            map.resolve_base_url(BackendDomain::Project),
            "https://projects.internal/api/v1"
        );
        assert_eq!(
            map.resolve_base_url(BackendDomain::Course),
            "http://localhost:8091/api/v1"
        );
    }

    #[test]
    fn test_url_for_joins_segments() {
        let map = EndpointMap::default();
        let url = map
            .url_for(BackendDomain::Project, &["projects", "p1", "readiness-score"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8096/api/v1/projects/p1/readiness-score"
        );
    }

    #[test]
    fn test_url_for_handles_trailing_slash_and_bare_host() {
        let mut map = EndpointMap::uniform("http://127.0.0.1:9000/");
        let url = map.url_for(BackendDomain::Course, &["courses"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/courses");

        map.set(BackendDomain::Course, "http://127.0.0.1:9000/api/v1/");
        let url = map.url_for(BackendDomain::Course, &["courses"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/api/v1/courses");
    }

    #[test]
    fn test_url_for_encodes_segments() {
        let map = EndpointMap::default();
        let url = map
            .url_for(BackendDomain::Course, &["courses", "a/b c"])
            .unwrap();
        assert_eq!(url.path(), "/api/v1/courses/a%2Fb%20c");
    }

    #[test]
    fn test_url_for_rejects_dot_and_empty_segments() {
        let map = EndpointMap::default();
        for bad in ["..", ".", ""] {
            let err = map
                .url_for(BackendDomain::Project, &["projects", bad])
                .unwrap_err();
            assert!(matches!(err, EgressError::InvalidRequest(_)), "segment {:?}", bad);
        }

        // Dots inside a segment are ordinary characters
        let url = map
            .url_for(BackendDomain::Project, &["projects", "v1..2", ".hidden"])
            .unwrap();
        assert_eq!(url.path(), "/api/v1/projects/v1..2/.hidden");
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut map = EndpointMap::default();
        map.set(BackendDomain::Skill, "");
        assert!(matches!(map.validate(), Err(EgressError::Config(_))));

        map.set(BackendDomain::Skill, "not a url");
        assert!(map.validate().is_err());

        map.set(BackendDomain::Skill, "ftp://skills.internal");
        assert!(map.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let map: EndpointMap =
            serde_json::from_str(r#"{"course": "https://courses.example.com/api/v1"}"#).unwrap();
        assert_eq!(
            map.resolve_base_url(BackendDomain::Course),
            "https://courses.example.com/api/v1"
        );
        assert_eq!(
            map.resolve_base_url(BackendDomain::EmployeeSync),
            "http://localhost:8097/api/v1"
        );
    }
}
