/// The authenticated caller, taken from the bearer token of the request.
///
/// Tokens are opaque. The value is only attached to the records the caller
/// creates and compared when reading them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

impl Identity {
    pub fn owner(&self) -> &str {
        &self.0
    }
}

fn bearer_token(parts: &axum::http::request::Parts) -> Option<&str> {
    let value = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;

    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = crate::api::ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => Ok(Self(token.to_owned())),
            None => Err(crate::api::ApiError::Unauthorized),
        }
    }
}
