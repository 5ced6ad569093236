pub mod health;
pub mod search;
pub mod settings;
pub mod spaces;
pub mod user;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

/// The authenticated user identity, resolved upstream (spec.md §1/§6: auth
/// middleware is deliberately out of scope — the core trusts whatever
/// identity the request carries). Falls back to `"anonymous"` so the core
/// degrades gracefully when no gateway is in front of it, matching
/// spec.md §6's auth boundary which is evaluated per-space, not per-request.
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or("anonymous")
            .to_string();
        Ok(UserId(user_id))
    }
}
