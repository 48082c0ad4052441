use std::fmt;

/// Everything one pipeline run needs to know about the requested feature.
///
/// Built once per run and never mutated.
#[derive(Clone)]
pub struct FeatureRequest {
    /// Remote URL (clone mode) or a location whose last segment names an
    /// existing working directory (reuse mode).
    pub location: String,
    /// Natural-language description, embedded verbatim into prompts.
    pub description: String,
    pub model: String,
    pub credential: String,
}

impl FeatureRequest {
    pub fn new(
        location: impl Into<String>,
        description: impl Into<String>,
        model: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            description: description.into(),
            model: model.into(),
            credential: credential.into(),
        }
    }

    /// Name of the working directory derived from the location.
    ///
    /// Trailing slashes and a `.git` suffix are ignored, so
    /// `https://host/org/repo.git/` and `org/repo` both yield `repo`.
    pub fn repository_name(&self) -> Option<&str> {
        let trimmed = self.location.trim().trim_end_matches('/');
        let last = trimmed.rsplit('/').next()?;
        let name = last.strip_suffix(".git").unwrap_or(last);
        if name.is_empty() { None } else { Some(name) }
    }
}

impl fmt::Debug for FeatureRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureRequest")
            .field("location", &self.location)
            .field("description", &self.description)
            .field("model", &self.model)
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(location: &str) -> FeatureRequest {
        FeatureRequest::new(location, "add rolling means", "m", "secret")
    }

    #[test]
    fn test_repository_name_from_url() {
        let req = request("https://github.com/acme/demand_forecasting");
        assert_eq!(req.repository_name(), Some("demand_forecasting"));
    }

    #[test]
    fn test_repository_name_strips_git_suffix_and_slash() {
        assert_eq!(request("https://github.com/acme/repo.git").repository_name(), Some("repo"));
        assert_eq!(request("https://github.com/acme/repo/").repository_name(), Some("repo"));
        assert_eq!(request("repo").repository_name(), Some("repo"));
    }

    #[test]
    fn test_repository_name_empty() {
        assert_eq!(request("").repository_name(), None);
        assert_eq!(request("///").repository_name(), None);
        assert_eq!(request("https://host/.git").repository_name(), None);
    }

    #[test]
    fn test_debug_redacts_credential() {
        let rendered = format!("{:?}", request("repo"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("secret"));
    }
}
