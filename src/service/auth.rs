use std::future::ready;

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use log::{debug, error};
use uuid::Uuid;

use crate::{
    errors::{ApiError, AuthFailure},
    AppState,
};

/// Identity resolved by the access guard for the current request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
}

/// Resolve an `Authorization` header value to a live user.
///
/// The token must verify, its user must still exist, and it must be the token
/// currently held in the session registry. A cryptographically valid token
/// that was logged out or superseded by a newer login is rejected with
/// [`AuthFailure::SessionExpired`].
pub async fn authenticate(state: &AppState, header: Option<&str>) -> Result<AuthenticatedUser, ApiError> {
    let token = header
        .and_then(jwt::parse_bearer)
        .ok_or(ApiError::Unauthorized(AuthFailure::MissingToken))?;
    let claims = state.tokens.verify(token)?;

    let is_current = state.sessions.is_current(claims.id, token).await?;
    let user = state
        .users
        .find_by_id(claims.id)
        .await?
        .ok_or_else(ApiError::unknown_user)?;

    if !is_current {
        debug!("rejecting superseded or revoked token for user {}", user.id);
        return Err(ApiError::Unauthorized(AuthFailure::SessionExpired));
    }

    Ok(AuthenticatedUser {
        user_id: user.id,
        email: user.email,
        name: user.name,
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthenticatedUser>() {
            return Box::pin(ready(Ok(user.clone())));
        }
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let req = req.clone();

        Box::pin(async move {
            let Some(state) = state else {
                error!("[{:} : {:}] application state is not registered", file!(), line!());
                return Err(ApiError::Internal);
            };
            let user = authenticate(&state, header.as_deref()).await?;
            req.extensions_mut().insert(user.clone());
            Ok(user)
        })
    }
}

pub mod jwt {
    use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
    use log::error;
    use uuid::Uuid;

    use crate::{
        dto::Claims,
        errors::{ApiError, AuthFailure},
    };

    /// HS256 signer/verifier for session tokens.
    pub struct TokenKeys {
        encoding: EncodingKey,
        decoding: DecodingKey,
        validation: Validation,
    }

    impl TokenKeys {
        pub fn from_secret(secret: &str) -> Self {
            let mut validation = Validation::new(Algorithm::HS256);
            // Tokens carry no `exp`; the session registry decides liveness.
            validation.required_spec_claims.clear();
            validation.validate_exp = false;
            Self {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                validation,
            }
        }

        pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, ApiError> {
            let claims = Claims::new(user_id, email);
            encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|err| {
                error!("[{:} : {:}] TOKEN ENCODING ERROR: {:?}", file!(), line!(), err);
                ApiError::Internal
            })
        }

        pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
            decode::<Claims>(token, &self.decoding, &self.validation)
                .map(|data| data.claims)
                .map_err(|_| ApiError::Unauthorized(AuthFailure::InvalidToken))
        }
    }

    /// Extract the token from a `Bearer <token>` header value. The scheme is case-insensitive.
    pub fn parse_bearer(header: &str) -> Option<&str> {
        let (scheme, token) = header.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn issued_token_verifies() {
            let keys = TokenKeys::from_secret("unit-test-secret");
            let id = Uuid::new_v4();
            let token = keys.issue(id, "a@x.com").unwrap();
            let claims = keys.verify(&token).unwrap();
            assert_eq!(claims.id, id);
            assert_eq!(claims.email, "a@x.com");
        }

        #[test]
        fn consecutive_tokens_differ() {
            let keys = TokenKeys::from_secret("unit-test-secret");
            let id = Uuid::new_v4();
            assert_ne!(keys.issue(id, "a@x.com").unwrap(), keys.issue(id, "a@x.com").unwrap());
        }

        #[test]
        fn tampered_or_foreign_tokens_are_invalid() {
            let keys = TokenKeys::from_secret("unit-test-secret");
            let other = TokenKeys::from_secret("another-secret");
            let token = keys.issue(Uuid::new_v4(), "a@x.com").unwrap();

            let invalid = ApiError::Unauthorized(AuthFailure::InvalidToken).to_string();
            assert_eq!(other.verify(&token).unwrap_err().to_string(), invalid);

            let mut tampered = token.clone();
            tampered.push('x');
            assert_eq!(keys.verify(&tampered).unwrap_err().to_string(), invalid);
            assert_eq!(keys.verify("not.a.jwt").unwrap_err().to_string(), invalid);
        }

        #[test]
        fn bearer_parsing() {
            assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
            assert_eq!(parse_bearer("bearer abc"), Some("abc"));
            assert_eq!(parse_bearer("Basic abc"), None);
            assert_eq!(parse_bearer("Bearer "), None);
            assert_eq!(parse_bearer("abc"), None);
        }
    }
}
