use serde_yaml::Value;
use thiserror::Error;

const TASK_NAME_KEY: &str = "annotation_task_name";
const SCHEMES_KEY: &str = "annotation_schemes";
const ANNOTATION_TYPE_KEY: &str = "annotation_type";
const SERVER_NAME_KEY: &str = "server_name";

/// The handful of display fields read out of an otherwise opaque project
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectConfigFields {
    pub task_name: Option<String>,
    pub annotation_type: Option<String>,
    pub server_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigDocumentError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("top-level document must be a mapping, found {0}")]
    NotMapping(&'static str),
    #[error("`annotation_schemes` must be a list, found {0}")]
    SchemesNotList(&'static str),
    #[error("first `annotation_schemes` entry must be a mapping, found {0}")]
    SchemeNotMapping(&'static str),
}

pub fn parse_project_config(raw: &[u8]) -> Result<ProjectConfigFields, ConfigDocumentError> {
    let document: Value = serde_yaml::from_slice(raw)?;
    if !document.is_mapping() {
        return Err(ConfigDocumentError::NotMapping(yaml_kind(&document)));
    }

    let annotation_type = match document.get(SCHEMES_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::Sequence(schemes)) => match schemes.first() {
            None => None,
            Some(scheme) if scheme.is_mapping() => {
                scheme.get(ANNOTATION_TYPE_KEY).and_then(scalar_text)
            }
            Some(scheme) => return Err(ConfigDocumentError::SchemeNotMapping(yaml_kind(scheme))),
        },
        Some(other) => return Err(ConfigDocumentError::SchemesNotList(yaml_kind(other))),
    };

    Ok(ProjectConfigFields {
        task_name: document.get(TASK_NAME_KEY).and_then(scalar_text),
        annotation_type,
        server_name: document.get(SERVER_NAME_KEY).and_then(scalar_text),
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
