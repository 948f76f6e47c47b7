//! Structured-output records.
//!
//! When the AI invokes the tenant's tool, the raw JSON arguments are
//! validated against the tenant's field specs before anything is persisted.
//! Validation failures name every offending field so the AI can re-collect
//! them mid-call. Persistence goes through the [`RecordStore`] seam; the
//! production implementation posts to Supabase.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::config::{FieldKind, TenantProfile};

mod supabase;

pub use supabase::SupabaseStore;

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The HTTP request could not be sent
    #[error("Store request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status
    #[error("Store rejected insert with status {status}: {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, truncated for logging
        body: String,
    },
}

/// Persists one validated record per call.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record into the named table.
    async fn insert(&self, table: &str, record: &Value) -> Result<(), StoreError>;
}

/// One problem with a submitted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    /// Field name
    pub field: String,
    /// What was wrong with it
    pub reason: String,
}

impl std::fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.field, self.reason)
    }
}

/// Why a tool invocation was rejected.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The arguments were not valid JSON
    #[error("Arguments are not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The arguments were not a JSON object
    #[error("Arguments must be a JSON object")]
    NotAnObject,

    /// One or more fields are missing or of the wrong shape
    #[error("Invalid fields: {}", format_problems(.0))]
    Fields(Vec<FieldProblem>),

    /// The tool name did not match the tenant's tool
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A record was already collected for this call
    #[error("A record was already collected for this call")]
    Duplicate,
}

fn format_problems(problems: &[FieldProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate raw tool arguments against the tenant's required fields.
///
/// Returns the record to persist: exactly the tenant's declared fields, in
/// declaration order, with unexpected extras dropped.
pub fn validate_arguments(tenant: &TenantProfile, raw: &str) -> Result<Value, ValidationError> {
    let parsed: Value = serde_json::from_str(raw)?;
    let object = parsed.as_object().ok_or(ValidationError::NotAnObject)?;

    let mut problems = Vec::new();
    let mut record = Map::new();

    for field in &tenant.fields {
        let Some(value) = object.get(field.name) else {
            problems.push(FieldProblem {
                field: field.name.to_string(),
                reason: "missing".to_string(),
            });
            continue;
        };

        match field.kind {
            FieldKind::Text => match value.as_str() {
                Some(text) if text.trim().is_empty() => {
                    problems.push(FieldProblem {
                        field: field.name.to_string(),
                        reason: "empty".to_string(),
                    });
                }
                Some(text) => {
                    if let Some(allowed) = field.allowed_values
                        && !allowed.contains(&text)
                    {
                        problems.push(FieldProblem {
                            field: field.name.to_string(),
                            reason: format!("must be one of {}", allowed.join(", ")),
                        });
                    } else {
                        record.insert(field.name.to_string(), value.clone());
                    }
                }
                None => {
                    problems.push(FieldProblem {
                        field: field.name.to_string(),
                        reason: "expected a string".to_string(),
                    });
                }
            },
            FieldKind::Number => {
                if value.is_number() {
                    record.insert(field.name.to_string(), value.clone());
                } else {
                    problems.push(FieldProblem {
                        field: field.name.to_string(),
                        reason: "expected a number".to_string(),
                    });
                }
            }
        }
    }

    if problems.is_empty() {
        Ok(Value::Object(record))
    } else {
        Err(ValidationError::Fields(problems))
    }
}

/// Tool result sent back into the conversation after a successful insert.
pub fn success_output(tenant: &TenantProfile) -> String {
    json!({
        "success": true,
        "message": format!(
            "{} recorded. Confirm the details to the caller.",
            tenant.tool_name
        ),
    })
    .to_string()
}

/// Tool result sent back when the invocation was rejected; the message tells
/// the AI what to re-collect.
pub fn failure_output(error: &ValidationError) -> String {
    json!({
        "success": false,
        "message": error.to_string(),
    })
    .to_string()
}

/// Tool result sent back when the record was valid but the store refused it.
pub fn store_failure_output() -> String {
    json!({
        "success": false,
        "message": "The record could not be saved. Apologize and let the caller \
                    know a team member will follow up.",
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_massage_arguments() {
        let tenant = TenantProfile::massage();
        let raw = r#"{
            "name": "Dana Reed",
            "phone": "+15551234567",
            "service": "deep_tissue",
            "preferred_time": "Friday afternoon"
        }"#;
        let record = validate_arguments(&tenant, raw).unwrap();
        assert_eq!(record["phone"], "+15551234567");
        assert_eq!(record.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_extra_fields_are_dropped() {
        let tenant = TenantProfile::massage();
        let raw = r#"{
            "name": "Dana Reed",
            "phone": "+15551234567",
            "service": "swedish",
            "preferred_time": "Friday",
            "notes": "unexpected"
        }"#;
        let record = validate_arguments(&tenant, raw).unwrap();
        assert!(record.get("notes").is_none());
    }

    #[test]
    fn test_missing_fields_are_all_named() {
        let tenant = TenantProfile::massage();
        let raw = r#"{"name": "Dana Reed"}"#;
        match validate_arguments(&tenant, raw) {
            Err(ValidationError::Fields(problems)) => {
                let fields: Vec<_> = problems.iter().map(|p| p.field.as_str()).collect();
                assert_eq!(fields, vec!["phone", "service", "preferred_time"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        let tenant = TenantProfile::cleaning();
        let raw = r#"{
            "property_address": "12 Elm St",
            "phone": "+15551234567",
            "property_type": "castle",
            "bedrooms": "three",
            "bathrooms": 2,
            "preferred_date": "Tuesday",
            "preferred_time": "10 AM"
        }"#;
        match validate_arguments(&tenant, raw) {
            Err(ValidationError::Fields(problems)) => {
                let fields: Vec<_> = problems.iter().map(|p| p.field.as_str()).collect();
                assert_eq!(fields, vec!["property_type", "bedrooms"]);
                assert!(problems[0].reason.contains("must be one of"));
                assert_eq!(problems[1].reason, "expected a number");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let tenant = TenantProfile::massage();
        assert!(matches!(
            validate_arguments(&tenant, "not json"),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            validate_arguments(&tenant, "[1,2,3]"),
            Err(ValidationError::NotAnObject)
        ));
    }

    #[test]
    fn test_failure_output_names_fields() {
        let tenant = TenantProfile::massage();
        let err = validate_arguments(&tenant, r#"{"name":"Dana Reed"}"#).unwrap_err();
        let output: Value = serde_json::from_str(&failure_output(&err)).unwrap();
        assert_eq!(output["success"], false);
        let message = output["message"].as_str().unwrap();
        assert!(message.contains("phone"));
        assert!(message.contains("preferred_time"));
    }

    #[test]
    fn test_success_output_shape() {
        let tenant = TenantProfile::cleaning();
        let output: Value = serde_json::from_str(&success_output(&tenant)).unwrap();
        assert_eq!(output["success"], true);
        assert!(
            output["message"]
                .as_str()
                .unwrap()
                .contains("schedule_estimate")
        );
    }
}
