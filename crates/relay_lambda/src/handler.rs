//! API Gateway transport mapping.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use lambda_http::http::{header::CONTENT_TYPE, Method, StatusCode};
use lambda_http::request::RequestContext;
use lambda_http::{Body, Error, Request, RequestExt, Response};
use relay_core::{InboundRequest, WebhookRelay};
use serde::Serialize;
use tracing::{info, warn};

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;

#[derive(Debug, Serialize)]
struct ResponseBody<'a> {
    status: &'a str,
    message: String,
}

/// Handle one API Gateway request.
///
/// Rejections and ignored events are answered with 200 so Bitbucket does not
/// retry them. Only internal failures produce a 500.
///
/// # Errors
/// Only fails if the HTTP response itself cannot be built.
pub async fn handle(request: Request, relay: &WebhookRelay) -> Result<Response<Body>, Error> {
    if request.method() != Method::POST {
        info!(method = %request.method(), "Ignoring non-POST request");
        return json_response(
            StatusCode::OK,
            "ignored",
            format!("method {} is not handled", request.method()),
        );
    }

    let inbound = inbound_request(&request);
    let outcome = relay.process(&inbound).await;

    let status = if outcome.is_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    json_response(status, outcome.status(), outcome.message())
}

/// Convert an API Gateway request into the transport-neutral request type.
///
/// Binary bodies are re-encoded as base64 so the relay decodes them the same
/// way as a base64 body delivered by the platform.
pub fn inbound_request(request: &Request) -> InboundRequest {
    let (raw_body, is_base64_encoded) = match request.body() {
        Body::Empty => (String::new(), false),
        Body::Text(text) => (text.clone(), false),
        Body::Binary(bytes) => (STANDARD.encode(bytes), true),
        #[allow(unreachable_patterns)]
        other => {
            warn!(body = ?other, "Unsupported request body type");
            (String::new(), false)
        }
    };

    let mut inbound = InboundRequest::new(request.headers().clone(), raw_body)
        .with_base64_body(is_base64_encoded);
    if let Some(source_ip) = platform_source_ip(request) {
        inbound = inbound.with_source_ip(source_ip);
    }
    inbound
}

/// Connection source address reported by API Gateway.
pub fn platform_source_ip(request: &Request) -> Option<String> {
    match request.request_context_ref()? {
        RequestContext::ApiGatewayV1(context) => context.identity.source_ip.clone(),
        RequestContext::ApiGatewayV2(context) => context.http.source_ip.clone(),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn json_response(
    status: StatusCode,
    outcome: &str,
    message: String,
) -> Result<Response<Body>, Error> {
    let body = serde_json::to_string(&ResponseBody {
        status: outcome,
        message,
    })?;

    let response = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))?;
    Ok(response)
}
