//! `http` tasks: render, sign, send, store the JSON response.

use serde_json::Value;
use tapestry_domain::{AuthKind, HttpTask};
use tracing::debug;

use super::{TaskEffect, TaskError};
use crate::context::ContextSnapshot;
use crate::ports::{OutboundRequest, RequestSigner, ResourceLoader, Transport};
use crate::template::render;

pub(super) async fn execute(
    transport: &dyn Transport,
    signer: &dyn RequestSigner,
    loader: &dyn ResourceLoader,
    task: &HttpTask,
    snapshot: &ContextSnapshot,
) -> Result<TaskEffect, TaskError> {
    let context_key = task.context_key.clone();

    let url = render(&task.url, snapshot.scope()).map_err(|source| TaskError::Template {
        context_key: context_key.clone(),
        source,
    })?;

    let mut request = OutboundRequest::new(task.http_method, url);
    request.headers.extend(task.headers.clone());

    if task.http_method.sends_payload()
        && let Some(body) = &task.body
    {
        request.body = Some(loader.load(body).await?);
        if request.header("content-type").is_none() {
            request
                .headers
                .insert("Content-Type".to_string(), "application/json".to_string());
        }
    }

    if task.auth == Some(AuthKind::AwsIam) {
        signer
            .sign(&mut request, snapshot.config())
            .map_err(|source| TaskError::Signing {
                context_key: context_key.clone(),
                source,
            })?;
    }

    debug!(method = %request.method, url = %request.url, "sending request");
    let response = transport
        .send(request)
        .await
        .map_err(|source| TaskError::Transport {
            context_key: context_key.clone(),
            source,
        })?;

    if !response.is_success() {
        return Err(TaskError::Status {
            context_key,
            status: response.status,
            body: response.body,
        });
    }

    let value = parse_body(&response.body).map_err(|e| TaskError::InvalidResponse {
        context_key: context_key.clone(),
        message: e.to_string(),
    })?;
    Ok(TaskEffect::Store {
        key: context_key,
        value,
    })
}

/// An empty body is stored as `null`.
fn parse_body(body: &str) -> Result<Value, serde_json::Error> {
    if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str(body)
    }
}
