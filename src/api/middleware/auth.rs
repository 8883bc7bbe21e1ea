use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::models::{Principal, Role};

pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USER_ROLE: &str = "x-user-role";

/// Authentication error responses
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingIdentity,
    InvalidIdentity,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingIdentity => (
                StatusCode::UNAUTHORIZED,
                "Authentication required. Please log in.",
            )
                .into_response(),
            AuthError::InvalidIdentity => {
                (StatusCode::UNAUTHORIZED, "Invalid identity headers.").into_response()
            }
        }
    }
}

/// Parses the trusted identity headers set by the upstream auth proxy into a
/// `Principal`. The core does not authenticate; it only reads what the
/// identity provider already verified.
pub fn principal_from_headers(
    user_id: Option<&str>,
    role: Option<&str>,
) -> Result<Principal, AuthError> {
    let user_id = user_id.ok_or(AuthError::MissingIdentity)?;
    let role = role.ok_or(AuthError::MissingIdentity)?;

    let user_id = Uuid::parse_str(user_id.trim()).map_err(|_| AuthError::InvalidIdentity)?;
    let role: Role = role.parse().map_err(|_| AuthError::InvalidIdentity)?;

    Ok(Principal { user_id, role })
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(HEADER_USER_ID)
            .and_then(|v| v.to_str().ok());
        let role = parts
            .headers
            .get(HEADER_USER_ROLE)
            .and_then(|v| v.to_str().ok());

        principal_from_headers(user_id, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_from_valid_headers() {
        let id = Uuid::new_v4();
        let principal =
            principal_from_headers(Some(&id.to_string()), Some("moderator")).unwrap();
        assert_eq!(principal.user_id, id);
        assert_eq!(principal.role, Role::Moderator);
    }

    #[test]
    fn test_missing_headers_rejected() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(
            principal_from_headers(None, Some("user")),
            Err(AuthError::MissingIdentity)
        );
        assert_eq!(
            principal_from_headers(Some(&id), None),
            Err(AuthError::MissingIdentity)
        );
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(
            principal_from_headers(Some("not-a-uuid"), Some("user")),
            Err(AuthError::InvalidIdentity)
        );
        assert_eq!(
            principal_from_headers(Some(&id), Some("root")),
            Err(AuthError::InvalidIdentity)
        );
    }
}
