//! Dispatch of model tool requests.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::mcp::error::McpError;
use crate::mcp::types::ContentBlock;
use crate::session::{CapabilitySession, ResourceRequest, ResourceResponse, SessionError};
use crate::tools::builtin::{LIST_RESOURCES, READ_RESOURCE};
use crate::tools::error::ToolError;
use crate::tools::tool_types::{ToolOutcome, ToolRequest};

/// Payload reported for a successful remote call without content.
pub const EMPTY_SUCCESS_PAYLOAD: &str = "Success";

/// Routes tool requests to the built-in resource tools or to the provider.
///
/// Names are not checked against the snapshot; anything that is not a
/// built-in goes to the provider, which reports unknown names itself.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    session: Arc<CapabilitySession>,
}

impl ToolInvoker {
    pub fn new(session: Arc<CapabilitySession>) -> Self {
        Self { session }
    }

    /// Run one request and normalize its result.
    ///
    /// Tool-level failures (provider errors, bad arguments, unknown tools)
    /// become error outcomes so the model can react to them.
    ///
    /// # Errors
    ///
    /// [`ToolError::ConnectionNotReady`] if the session has no live
    /// connection; that ends the current run.
    pub async fn invoke(&self, request: &ToolRequest) -> Result<ToolOutcome, ToolError> {
        log::info!("Executing tool '{}' (call {})", request.name, request.id);
        match self.dispatch(&request.name, &request.arguments).await {
            Ok(payload) => {
                log::debug!("Tool '{}' succeeded ({} bytes)", request.name, payload.len());
                Ok(ToolOutcome::success(&request.id, payload))
            }
            Err(ToolError::ConnectionNotReady) => Err(ToolError::ConnectionNotReady),
            Err(e) => {
                log::warn!("Tool '{}' failed: {}", request.name, e);
                Ok(ToolOutcome::error(&request.id, e.to_string()))
            }
        }
    }

    async fn dispatch(&self, name: &str, arguments: &Value) -> Result<String, ToolError> {
        match name {
            LIST_RESOURCES => self.list_resources().await,
            READ_RESOURCE => {
                let uri = resource_uri(arguments)?;
                self.read_resource(uri).await
            }
            _ => self.call_remote(name, arguments).await,
        }
    }

    async fn list_resources(&self) -> Result<String, ToolError> {
        match self.session.fetch_resource(ResourceRequest::List).await {
            Ok(ResourceResponse::Resources(resources)) => to_payload(&resources),
            Ok(ResourceResponse::Contents(contents)) => to_payload(&contents),
            Err(e) => Err(from_session_error(e)),
        }
    }

    async fn read_resource(&self, uri: &str) -> Result<String, ToolError> {
        let request = ResourceRequest::Read {
            uri: uri.to_string(),
        };
        match self.session.fetch_resource(request).await {
            Ok(ResourceResponse::Contents(contents)) => to_payload(&contents),
            Ok(ResourceResponse::Resources(resources)) => to_payload(&resources),
            Err(e) => Err(from_session_error(e)),
        }
    }

    async fn call_remote(&self, name: &str, arguments: &Value) -> Result<String, ToolError> {
        // Providers expect an arguments object, never null.
        if self.session.current_snapshot().tool(name).is_none() {
            log::warn!("Tool '{}' was not discovered; forwarding it anyway", name);
        }
        let arguments = match arguments {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other.clone(),
        };
        let result = self
            .session
            .invoke(name, arguments)
            .await
            .map_err(from_session_error)?;
        if result.content.is_empty() {
            Ok(EMPTY_SUCCESS_PAYLOAD.to_string())
        } else {
            to_payload(&result.content)
        }
    }
}

/// Extract and validate the `uri` argument of `read_resource`.
fn resource_uri(arguments: &Value) -> Result<&str, ToolError> {
    let uri = match arguments.get("uri") {
        Some(Value::String(uri)) => uri.as_str(),
        Some(other) => {
            return Err(ToolError::InvalidArgument(format!(
                "'uri' must be a string, got {}",
                other
            )))
        }
        None => return Err(ToolError::InvalidArgument("missing required argument 'uri'".into())),
    };
    reqwest::Url::parse(uri)
        .map_err(|e| ToolError::InvalidArgument(format!("malformed uri '{}': {}", uri, e)))?;
    Ok(uri)
}

fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string(value).map_err(|e| ToolError::RemoteTool(e.to_string()))
}

fn from_session_error(error: SessionError) -> ToolError {
    match error {
        SessionError::ConnectionNotReady | SessionError::Provider(McpError::NotConnected) => {
            ToolError::ConnectionNotReady
        }
        SessionError::RemoteTool { content, .. } => ToolError::RemoteTool(content_text(&content)),
        other => ToolError::RemoteTool(other.to_string()),
    }
}

/// Flatten provider error content to text, keeping text blocks verbatim.
fn content_text(content: &[ContentBlock]) -> String {
    content
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => text.clone(),
            ContentBlock::Other(value) => value.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::mcp::types::{CallToolResult, ResourceContents, ResourceDescriptor};
    use crate::testing::{connected_session, ui_tools, StubProvider};
    use crate::tools::tool_types::ToolStatus;

    async fn invoker_for(provider: StubProvider) -> (ToolInvoker, Arc<StubProvider>) {
        let provider = Arc::new(provider);
        let session = connected_session(provider.clone()).await;
        (ToolInvoker::new(session), provider)
    }

    #[tokio::test]
    async fn test_remote_success_without_content_is_success() {
        let (invoker, provider) = invoker_for(
            StubProvider::new(ui_tools(), "p")
                .with_result("create_surface", CallToolResult::success(vec![])),
        )
        .await;
        let request = ToolRequest::new("call_1", "create_surface", json!({"surfaceId": "main"}));

        let outcome = invoker.invoke(&request).await.unwrap();
        assert_eq!(outcome, ToolOutcome::success("call_1", "Success"));
        let calls = provider.calls.lock();
        assert_eq!(calls[0].0, "create_surface");
        assert_eq!(calls[0].1, json!({"surfaceId": "main"}));
    }

    #[tokio::test]
    async fn test_remote_content_is_serialized_in_order() {
        let (invoker, _) = invoker_for(StubProvider::new(ui_tools(), "p").with_result(
            "update_components",
            CallToolResult::success(vec![
                ContentBlock::text("first"),
                ContentBlock::Other(json!({"type": "image", "data": "AA==", "mimeType": "image/png"})),
            ]),
        ))
        .await;
        let request = ToolRequest::new("call_2", "update_components", json!({}));

        let outcome = invoker.invoke(&request).await.unwrap();
        assert_eq!(outcome.status, ToolStatus::Success);
        let parsed: Value = serde_json::from_str(&outcome.payload).unwrap();
        assert_eq!(parsed[0], json!({"type": "text", "text": "first"}));
        assert_eq!(parsed[1]["type"], "image");
    }

    #[tokio::test]
    async fn test_remote_error_text_is_verbatim() {
        let (invoker, _) = invoker_for(StubProvider::new(ui_tools(), "p").with_result(
            "update_components",
            CallToolResult::error(vec![ContentBlock::text("Component 'Gauge' is not in the catalog")]),
        ))
        .await;
        let request = ToolRequest::new("call_3", "update_components", json!({}));

        let outcome = invoker.invoke(&request).await.unwrap();
        assert_eq!(outcome.status, ToolStatus::Error);
        assert_eq!(outcome.payload, "Error: Component 'Gauge' is not in the catalog");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_forwarded_to_provider() {
        let (invoker, provider) = invoker_for(StubProvider::new(ui_tools(), "p")).await;
        let request = ToolRequest::new("call_4", "launch_rocket", Value::Null);

        let outcome = invoker.invoke(&request).await.unwrap();
        assert!(outcome.is_error());
        assert!(outcome.payload.contains("Unknown tool: launch_rocket"));
        // Null arguments are sent as an empty object.
        assert_eq!(provider.calls.lock()[0].1, json!({}));
    }

    #[tokio::test]
    async fn test_list_resources_builtin() {
        let resources = vec![ResourceDescriptor {
            uri: "catalog://standard".to_string(),
            name: "Standard catalog".to_string(),
            description: None,
            mime_type: Some("application/json".to_string()),
        }];
        let (invoker, provider) =
            invoker_for(StubProvider::new(ui_tools(), "p").with_resources(resources)).await;
        let request = ToolRequest::new("call_5", "list_resources", json!({}));

        let outcome = invoker.invoke(&request).await.unwrap();
        assert_eq!(outcome.status, ToolStatus::Success);
        let parsed: Value = serde_json::from_str(&outcome.payload).unwrap();
        assert_eq!(parsed[0]["uri"], "catalog://standard");
        assert_eq!(parsed[0]["mimeType"], "application/json");
        assert!(provider.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_read_resource_builtin() {
        let contents = vec![ResourceContents {
            uri: "catalog://standard".to_string(),
            mime_type: Some("application/json".to_string()),
            text: Some("{\"components\":[\"Card\"]}".to_string()),
            blob: None,
        }];
        let (invoker, _) =
            invoker_for(StubProvider::new(ui_tools(), "p").with_contents(contents)).await;
        let request = ToolRequest::new("call_6", "read_resource", json!({"uri": "catalog://standard"}));

        let outcome = invoker.invoke(&request).await.unwrap();
        assert_eq!(outcome.status, ToolStatus::Success);
        let parsed: Value = serde_json::from_str(&outcome.payload).unwrap();
        assert_eq!(parsed[0]["text"], "{\"components\":[\"Card\"]}");
    }

    #[tokio::test]
    async fn test_read_resource_missing_uri_is_invalid_argument() {
        let (invoker, _) = invoker_for(StubProvider::new(ui_tools(), "p")).await;
        let request = ToolRequest::new("call_7", "read_resource", json!({}));

        let outcome = invoker.invoke(&request).await.unwrap();
        assert!(outcome.is_error());
        assert!(outcome.payload.starts_with("Invalid argument:"));
    }

    #[tokio::test]
    async fn test_read_resource_malformed_uri_is_invalid_argument() {
        let (invoker, _) = invoker_for(StubProvider::new(ui_tools(), "p")).await;
        for args in [json!({"uri": "not a uri"}), json!({"uri": 42})] {
            let request = ToolRequest::new("call_8", "read_resource", args);
            let outcome = invoker.invoke(&request).await.unwrap();
            assert!(outcome.is_error());
            assert!(outcome.payload.starts_with("Invalid argument:"));
        }
    }

    #[tokio::test]
    async fn test_not_ready_session_fails_the_call() {
        let provider = Arc::new(StubProvider::new(ui_tools(), "p"));
        let session = connected_session(provider).await;
        session.disconnect().await;
        let invoker = ToolInvoker::new(session);

        let err = invoker
            .invoke(&ToolRequest::new("call_9", "create_surface", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ConnectionNotReady));
    }
}
