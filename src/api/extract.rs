//! Request extractors: the authenticated session and JSON bodies.

use super::AppState;
use crate::core::auth::{self, Session};
use crate::errors::Error;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

/// Token key from an `Authorization: Token <key>` or `Bearer <key>` header.
fn token_key(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, key) = header.trim().split_once(' ')?;
    let key = key.trim();
    let known = scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer");
    (known && !key.is_empty()).then_some(key)
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let key = token_key(parts).ok_or(Error::Unauthorized)?;
        auth::authenticate(&state.db, &state.config.auth, key).await
    }
}

/// JSON body whose parse failures are `400 Bad Request`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(Error::BadRequest {
                message: rejection.body_text(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use axum::http::Request as HttpRequest;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder().uri("/waste-bins/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_key_schemes() {
        assert_eq!(token_key(&parts(Some("Token abc123"))), Some("abc123"));
        assert_eq!(token_key(&parts(Some("Bearer abc123"))), Some("abc123"));
        assert_eq!(token_key(&parts(Some("bearer  abc123 "))), Some("abc123"));
        assert_eq!(token_key(&parts(Some("Basic abc123"))), None);
        assert_eq!(token_key(&parts(Some("Token "))), None);
        assert_eq!(token_key(&parts(None)), None);
    }
}
