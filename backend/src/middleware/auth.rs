//! Authentication middleware
//!
//! Verifies bearer tokens and attaches the acting principal to the request.
//! Tokens are issued elsewhere; this layer only reads `sub` and `role`.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::{Principal, Role};

use crate::error::AppError;
use crate::AppState;

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Resolve the claims into the principal they describe
    pub fn principal(&self) -> Result<Principal, String> {
        let id = uuid::Uuid::parse_str(&self.sub).map_err(|_| "Invalid user ID in token")?;
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| format!("Unknown role in token: {}", self.role))?;
        Ok(Principal::new(id, role))
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token.to_string(),
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let principal = match decode_jwt(&token, &state.config.jwt.secret)
        .and_then(|claims| claims.principal())
    {
        Ok(principal) => principal,
        Err(msg) => return unauthorized_response(&msg),
    };

    tracing::debug!(user_id = %principal.id, role = %principal.role, "Authenticated request");
    request.extensions_mut().insert(principal);

    next.run(request).await
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}

/// Extractor for the authenticated principal
/// Use this in handlers to get the acting user
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub Principal);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(CurrentUser)
            .ok_or_else(|| unauthorized_response("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(sub: &str, role: &str, secret: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            iat: now,
            exp: now + 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_principal() {
        let id = uuid::Uuid::new_v4();
        let token = token_for(&id.to_string(), "stock_manager", "secret");
        let principal = decode_jwt(&token, "secret").unwrap().principal().unwrap();
        assert_eq!(principal, Principal::new(id, Role::StockManager));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = token_for(&uuid::Uuid::new_v4().to_string(), "worker", "secret");
        assert!(decode_jwt(&token, "other").is_err());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let token = token_for(&uuid::Uuid::new_v4().to_string(), "supervisor", "secret");
        let claims = decode_jwt(&token, "secret").unwrap();
        assert!(claims.principal().is_err());
    }
}
