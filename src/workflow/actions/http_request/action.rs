use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

use crate::{
    Result,
    blocks::BlockType,
    common::Vars,
    workflow::actions::{Action, ActionContext, ActionOutput, Route},
};

use super::models::*;

const STATUS_CODE_KEY: &str = "statusCode";
const BODY_KEY: &str = "body";
const HEADERS_KEY: &str = "headers";

pub struct HttpRequestAction;

impl HttpRequestAction {
    /// Authorization header value for the configured auth type
    fn auth_header(
        &self,
        ctx: &ActionContext<'_>,
        settings: &HttpRequestSettings,
    ) -> Result<Option<HeaderValue>> {
        let token = settings.auth_token.trim();
        let value = match settings.auth_type {
            AuthType::None => return Ok(None),
            _ if token.is_empty() => return Err(ctx.error("authToken is required for bearer and basic auth")),
            AuthType::Bearer => format!("Bearer {}", token),
            AuthType::Basic => {
                // `user:password` is encoded, anything else is taken as already encoded
                let encoded = if token.contains(':') { STANDARD.encode(token.as_bytes()) } else { token.to_string() };
                format!("Basic {}", encoded)
            }
        };
        let value = HeaderValue::from_str(&value).map_err(|e| ctx.error(format!("invalid auth header: {}", e)))?;
        Ok(Some(value))
    }

    fn build_request(
        &self,
        ctx: &ActionContext<'_>,
        settings: &HttpRequestSettings,
    ) -> Result<reqwest::RequestBuilder> {
        let url = settings.url.trim();
        if url.is_empty() {
            return Err(ctx.error("url is empty"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("accept"), HeaderValue::from_static("*/*"));
        if let Some(auth) = self.auth_header(ctx, settings)? {
            headers.insert(AUTHORIZATION, auth);
        }
        for (key, value) in &settings.headers {
            headers.insert(
                key.parse::<HeaderName>().map_err(|e| ctx.error(format!("invalid header name '{}': {}", key, e)))?,
                value.parse::<HeaderValue>().map_err(|e| ctx.error(format!("invalid value for header '{}': {}", key, e)))?,
            );
        }

        let method = reqwest::Method::from_bytes(settings.method.as_ref().as_bytes()).map_err(|e| ctx.error(e.to_string()))?;
        let mut request = ctx.services.http.request(method, url);

        let body = settings.body.trim();
        if !body.is_empty() {
            match serde_json::from_str::<Value>(body) {
                Ok(json) => {
                    if !headers.contains_key(CONTENT_TYPE) {
                        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                    }
                    request = request.body(serde_json::to_vec(&json)?);
                }
                Err(_) => request = request.body(body.to_string()),
            }
        }

        Ok(request.headers(headers).timeout(Duration::from_millis(ctx.services.config.http_timeout_ms)))
    }
}

#[async_trait]
impl Action for HttpRequestAction {
    type Settings = HttpRequestSettings;

    fn block_type(&self) -> BlockType {
        BlockType::HttpRequest
    }

    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: HttpRequestSettings,
    ) -> Result<ActionOutput> {
        let request = self.build_request(ctx, &settings)?;
        let response = request.send().await.map_err(|e| ctx.error(format!("request failed: {}", e)))?;

        let status = response.status();
        let headers: Map<String, Value> =
            response.headers().iter().filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), Value::String(v.to_string())))).collect();
        let text = response.text().await.map_err(|e| ctx.error(format!("failed to read response: {}", e)))?;
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(json) => json,
            Err(_) => Value::String(text),
        };

        let outputs = Vars::new().with(STATUS_CODE_KEY, status.as_u16()).with(BODY_KEY, body).with(HEADERS_KEY, headers);
        let summary = format!("{} {} -> {}", settings.method.as_ref(), settings.url.trim(), status.as_u16());

        let output = if status.is_success() { ActionOutput::success(summary) } else { ActionOutput::warning(summary).with_route(Route::Next) };
        Ok(output.with_outputs(outputs))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;
    use crate::{execution::LogStatus, testing};

    /// Serves one request and answers with `status` and a JSON body echoing
    /// the raw request head.
    async fn serve_once(status: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let head = String::from_utf8_lossy(&buf[..n]).to_lowercase();
            let body = json!({"request": head}).to_string();
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn run(config: Value) -> Result<ActionOutput> {
        let services = testing::services();
        let run = testing::run_context(json!({"message": "hello", "from": "+225"}));
        let node = testing::node(11, "http_request", "Api", config);
        testing::run_handler(&HttpRequestAction, &node, &run, &services).await
    }

    #[tokio::test]
    async fn test_get_with_bearer() {
        let base = serve_once("200 OK").await;
        let output = run(json!({
            "url": format!("{}/contacts/{{{{trigger.from}}}}", base),
            "authType": "bearer",
            "authToken": "secret",
            "headers": {"x-source": "<trigger.message>"}
        }))
        .await
        .unwrap();

        assert_eq!(output.status, LogStatus::Success);
        assert_eq!(output.outputs.get::<u16>(STATUS_CODE_KEY), Some(200));
        let head = output.outputs.get_value(BODY_KEY).and_then(|b| b.get("request")).and_then(Value::as_str).unwrap().to_string();
        assert!(head.starts_with("get /contacts/+225 "));
        assert!(head.contains("authorization: bearer secret"));
        assert!(head.contains("x-source: hello"));
        assert_eq!(output.outputs.get_value(HEADERS_KEY).and_then(|h| h.get("content-type")), Some(&json!("application/json")));
    }

    #[tokio::test]
    async fn test_error_status_is_a_warning() {
        let base = serve_once("503 Service Unavailable").await;
        let output = run(json!({"url": base, "method": "POST", "body": "{\"a\": 1}"})).await.unwrap();
        assert_eq!(output.status, LogStatus::Warning);
        assert_eq!(output.route, Route::Next);
        assert_eq!(output.outputs.get::<u16>(STATUS_CODE_KEY), Some(503));
    }

    #[tokio::test]
    async fn test_basic_auth_encoding() {
        let base = serve_once("200 OK").await;
        let output = run(json!({"url": base, "authType": "basic", "authToken": "user:pass"})).await.unwrap();
        let head = output.outputs.get_value(BODY_KEY).and_then(|b| b.get("request")).and_then(Value::as_str).unwrap().to_string();
        assert!(head.contains(&format!("authorization: basic {}", STANDARD.encode("user:pass")).to_lowercase()));
    }

    #[tokio::test]
    async fn test_missing_token() {
        let err = run(json!({"url": "http://127.0.0.1:9", "authType": "bearer"})).await.unwrap_err();
        assert!(err.to_string().contains("authToken"));
    }
}
