//! HTTP Basic authentication: a middleware that resolves credentials into an
//! [`Identity`] and an extractor that hands it to handlers.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use crate::api::rest::error::{from_parts, map_domain_error};
use crate::domain::error::DomainError;
use crate::domain::identity::Identity;
use crate::domain::service::UsersService;

pub const WWW_AUTHENTICATE_VALUE: &str = r#"Basic realm="avc_forms""#;

/// 401 problem carrying the `WWW-Authenticate` challenge.
pub fn unauthorized(detail: impl Into<String>, instance: &str) -> Response {
    let mut resp = from_parts(
        StatusCode::UNAUTHORIZED,
        "AVC_UNAUTHENTICATED",
        "Authentication required",
        detail,
        instance,
    )
    .into_response();
    resp.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
    );
    resp
}

/// Extract `(username, password)` from an `Authorization: Basic` header.
pub fn parse_basic(headers: &HeaderMap) -> Result<(String, String), &'static str> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .ok_or("Authentication credentials were not provided.")?
        .to_str()
        .map_err(|_| "Invalid basic header. Credentials not correctly encoded.")?;

    let (scheme, encoded) = raw
        .split_once(' ')
        .ok_or("Invalid basic header. No credentials provided.")?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err("Authentication credentials were not provided.");
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| "Invalid basic header. Credentials not correctly base64 encoded.")?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| "Invalid basic header. Credentials not correctly base64 encoded.")?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or("Invalid basic header. Credentials not correctly base64 encoded.")?;
    Ok((username.to_string(), password.to_string()))
}

/// Route-layer middleware used on every resource route.
pub async fn basic_auth(
    State(users): State<Arc<UsersService>>,
    mut req: Request,
    next: Next,
) -> Response {
    let instance = req.uri().path().to_string();

    let (username, password) = match parse_basic(req.headers()) {
        Ok(creds) => creds,
        Err(reason) => {
            debug!(path = %instance, "rejecting request: {reason}");
            return unauthorized(reason, &instance);
        }
    };

    match users.authenticate(&username, &password).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(DomainError::Unauthenticated { reason }) => unauthorized(reason, &instance),
        Err(e) => map_domain_error(&e, &instance).into_response(),
    }
}

/// The authenticated requester, inserted by [`basic_auth`].
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| {
                unauthorized(
                    "Authentication credentials were not provided.",
                    parts.uri.path(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn parses_valid_basic_credentials() {
        let value = format!("Basic {}", STANDARD.encode("nurse:s3cret:with:colons"));
        let (u, p) = parse_basic(&headers_with(&value)).unwrap();
        assert_eq!(u, "nurse");
        assert_eq!(p, "s3cret:with:colons");
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        assert!(parse_basic(&HeaderMap::new()).is_err());
        assert!(parse_basic(&headers_with("Bearer abc")).is_err());
        assert!(parse_basic(&headers_with("Basic !!!")).is_err());
        let no_colon = format!("Basic {}", STANDARD.encode("nurse"));
        assert!(parse_basic(&headers_with(&no_colon)).is_err());
    }

    #[test]
    fn unauthorized_sets_challenge() {
        let resp = unauthorized("nope", "/api/patients");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            WWW_AUTHENTICATE_VALUE
        );
    }
}
