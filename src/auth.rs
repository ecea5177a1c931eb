//! Bearer token authentication for the HTTP transport.

use crate::error::{ToolError, ToolResult};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

/// Accepted bearer tokens. Authentication is off when there are none.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    tokens: HashSet<String>,
}

impl AuthConfig {
    /// Build from configured tokens; blank tokens are a configuration error.
    pub fn from_tokens(tokens: Vec<String>) -> ToolResult<Self> {
        let tokens = tokens
            .iter()
            .map(|t| t.trim())
            .map(|t| {
                if t.is_empty() {
                    Err(ToolError::configuration(
                        "auth-token values must not be blank",
                    ))
                } else {
                    Ok(t.to_string())
                }
            })
            .collect::<ToolResult<HashSet<_>>>()?;
        Ok(Self { tokens })
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Compare against every token so timing does not reveal which matched.
    pub fn verify(&self, provided: &str) -> bool {
        self.tokens.iter().fold(false, |found, expected| {
            constant_time_eq(provided.as_bytes(), expected.as_bytes()) | found
        })
    }
}

/// Rejects requests without a valid `Authorization: Bearer <token>` header.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Ok(Some(token)) => token,
        Ok(None) => {
            warn!(path = %request.uri().path(), "Rejected request without credentials");
            return unauthorized_response(
                "Authorization header is missing",
                "Send 'Authorization: Bearer <token>' with every request",
            );
        }
        Err(msg) => {
            warn!(path = %request.uri().path(), "Rejected request with malformed credentials");
            return unauthorized_response(msg, "Send 'Authorization: Bearer <token>'");
        }
    };

    if !auth.verify(token) {
        warn!(token = %mask_token(token), "Rejected request with unknown token");
        return unauthorized_response(
            "Token is not accepted by this server",
            "Use one of the tokens passed via --auth-token or MCP_AUTH_TOKENS",
        );
    }
    next.run(request).await
}

fn bearer_token(request: &Request<Body>) -> Result<Option<&str>, &'static str> {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| "Authorization header is not valid ASCII")?;
    match value.strip_prefix("Bearer ") {
        Some("") => Err("Bearer token is blank"),
        Some(token) => Ok(Some(token)),
        None => Err("Authorization scheme must be Bearer"),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

fn mask_token(token: &str) -> String {
    match token.char_indices().nth(3) {
        Some((idx, _)) => format!("{}***", &token[..idx]),
        None => "***".to_string(),
    }
}

/// 401 with a JSON body shaped like the tool errors: `kind`, `message`, `suggestion`.
fn unauthorized_response(message: &str, suggestion: &str) -> Response {
    let body = json!({
        "error": {
            "kind": "unauthorized",
            "message": message,
            "suggestion": suggestion,
        }
    });
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tokens() {
        let auth = AuthConfig::from_tokens(vec![" alpha ".to_string(), "beta".to_string()]).unwrap();
        assert!(auth.is_enabled());
        assert_eq!(auth.token_count(), 2);
        assert!(auth.verify("alpha"));
        assert!(auth.verify("beta"));
        assert!(!auth.verify("gamma"));
        assert!(!auth.verify("alph"));
    }

    #[test]
    fn test_blank_token_is_rejected() {
        let err = AuthConfig::from_tokens(vec!["ok".to_string(), "  ".to_string()]).unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_disabled_by_default() {
        assert!(!AuthConfig::default().is_enabled());
        assert!(!AuthConfig::from_tokens(Vec::new()).unwrap().is_enabled());
    }

    #[test]
    fn test_bearer_token() {
        let request = Request::get("/")
            .header(header::AUTHORIZATION, "Bearer abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request), Ok(Some("abc")));

        let request = Request::get("/")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        assert!(bearer_token(&request).is_err());

        let request = Request::get("/").body(Body::empty()).unwrap();
        assert_eq!(bearer_token(&request), Ok(None));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("abcdef"), "abc***");
        assert_eq!(mask_token("ab"), "***");
    }
}
