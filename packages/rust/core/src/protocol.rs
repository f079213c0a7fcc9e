//! Message variants exchanged over the bus.
//!
//! Field names serialize in camelCase and variants carry an `action` tag, so
//! the JSON form matches what the popup and content script exchange.

use serde::{Deserialize, Serialize};

use fieldfill_shared::{FieldDescriptor, FillResult};

use crate::bus::{BusClient, BusReceiver};

/// Requests handled by the background coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BackgroundRequest {
    /// Fan out one completion per field.
    ProcessFields {
        fields: Vec<FieldDescriptor>,
        system_prompt: String,
        #[serde(default)]
        api_key: Option<String>,
    },
    /// Verify that the key is accepted by the backend.
    TestConnection {
        #[serde(default)]
        api_key: Option<String>,
    },
}

/// Coordinator reply to a [`BackgroundRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<FillResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackgroundResponse {
    pub fn results(results: Vec<FillResult>) -> Self {
        Self {
            success: true,
            results: Some(results),
            ..Self::default()
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Requests handled by a page session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PageRequest {
    /// Run the whole scan, dispatch and apply session.
    FillForms {
        system_prompt: String,
        #[serde(default)]
        api_key: Option<String>,
    },
    /// Scan only and report what would be filled.
    GetFieldCount,
}

/// Page session reply to a [`PageRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageResponse {
    Fill {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    FieldCount {
        count: usize,
        fields: Vec<FieldDescriptor>,
    },
}

pub type BackgroundClient = BusClient<BackgroundRequest, BackgroundResponse>;
pub type BackgroundReceiver = BusReceiver<BackgroundRequest, BackgroundResponse>;
pub type PageClient = BusClient<PageRequest, PageResponse>;
pub type PageReceiver = BusReceiver<PageRequest, PageResponse>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn process_fields_wire_shape() {
        let request: BackgroundRequest = serde_json::from_value(json!({
            "action": "processFields",
            "fields": [{
                "id": "field_0",
                "type": "email",
                "tagName": "input",
                "name": "email",
                "placeholder": "",
                "required": false,
                "label": "Email",
                "context": ""
            }],
            "systemPrompt": "Be brief.",
            "apiKey": "sk-ant-1"
        }))
        .unwrap();

        let BackgroundRequest::ProcessFields {
            fields,
            system_prompt,
            api_key,
        } = request
        else {
            panic!("expected processFields");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(system_prompt, "Be brief.");
        assert_eq!(api_key.as_deref(), Some("sk-ant-1"));
    }

    #[test]
    fn missing_api_key_deserializes_as_none() {
        let request: BackgroundRequest =
            serde_json::from_value(json!({ "action": "testConnection" })).unwrap();
        assert_eq!(request, BackgroundRequest::TestConnection { api_key: None });
    }

    #[test]
    fn error_response_omits_results() {
        let value = serde_json::to_value(BackgroundResponse::error("No fields to process")).unwrap();
        assert_eq!(
            value,
            json!({ "success": false, "error": "No fields to process" })
        );
    }

    #[test]
    fn page_responses_are_untagged() {
        let fill = serde_json::to_value(PageResponse::Fill {
            success: true,
            error: None,
        })
        .unwrap();
        assert_eq!(fill, json!({ "success": true }));

        let count = serde_json::to_value(PageResponse::FieldCount {
            count: 0,
            fields: vec![],
        })
        .unwrap();
        assert_eq!(count, json!({ "count": 0, "fields": [] }));

        let request: PageRequest =
            serde_json::from_value(json!({ "action": "getFieldCount" })).unwrap();
        assert_eq!(request, PageRequest::GetFieldCount);
    }
}
