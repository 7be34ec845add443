use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Identity of a project configuration: the hub directory it lives in plus the
/// config file stem. Two ids are equal when their rendered keys are equal,
/// which is what makes key collisions between distinct files detectable.
#[derive(Debug, Clone)]
pub struct ProjectId {
    project_dir: String,
    config_stem: String,
    key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectIdError {
    #[error("{component} must not be empty")]
    Empty { component: &'static str },
    #[error("{component} '{value}' must be a single path component")]
    NotAComponent {
        component: &'static str,
        value: String,
    },
}

impl ProjectId {
    pub fn new(
        project_dir: impl Into<String>,
        config_stem: impl Into<String>,
    ) -> Result<Self, ProjectIdError> {
        let project_dir = project_dir.into();
        let config_stem = config_stem.into();
        validate_component("project directory", &project_dir)?;
        validate_component("config file stem", &config_stem)?;
        let key = format!("{project_dir}_{config_stem}");
        Ok(Self {
            project_dir,
            config_stem,
            key,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn project_dir(&self) -> &str {
        &self.project_dir
    }

    pub fn config_stem(&self) -> &str {
        &self.config_stem
    }

    /// True when `requested` (e.g. a route segment) names this project.
    pub fn matches(&self, requested: &str) -> bool {
        self.key == requested
    }
}

fn validate_component(component: &'static str, value: &str) -> Result<(), ProjectIdError> {
    if value.is_empty() {
        return Err(ProjectIdError::Empty { component });
    }
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(ProjectIdError::NotAComponent {
            component,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl PartialEq for ProjectId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ProjectId {}

impl Hash for ProjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for ProjectId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProjectId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl Serialize for ProjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn unit_project_id_key_joins_directory_and_stem() {
        let id = ProjectId::new("sentiment", "a").expect("id");
        assert_eq!(id.as_str(), "sentiment_a");
        assert_eq!(id.to_string(), "sentiment_a");
        assert_eq!(id.project_dir(), "sentiment");
        assert_eq!(id.config_stem(), "a");
        assert!(id.matches("sentiment_a"));
        assert!(!id.matches("sentiment"));
    }

    #[test]
    fn regression_distinct_components_with_equal_keys_compare_equal() {
        let left = ProjectId::new("a_b", "c").expect("left");
        let right = ProjectId::new("a", "b_c").expect("right");
        assert_eq!(left, right);
        let unique: HashSet<ProjectId> = [left, right].into_iter().collect();
        assert_eq!(unique.len(), 1);
    }

    #[test]
    fn regression_project_id_rejects_empty_and_path_like_components() {
        assert_eq!(
            ProjectId::new("", "a"),
            Err(ProjectIdError::Empty {
                component: "project directory"
            })
        );
        assert!(matches!(
            ProjectId::new("sentiment", "../etc"),
            Err(ProjectIdError::NotAComponent { .. })
        ));
        assert!(matches!(
            ProjectId::new("..", "a"),
            Err(ProjectIdError::NotAComponent { .. })
        ));
    }

    #[test]
    fn unit_project_id_serializes_as_key() {
        let id = ProjectId::new("ner_news", "config").expect("id");
        assert_eq!(
            serde_json::to_string(&id).expect("serialize"),
            "\"ner_news_config\""
        );
    }
}
