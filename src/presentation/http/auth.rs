use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    routing::get,
};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::ports::user_directory::Session;
use crate::application::use_cases::auth::me::GetMe;
use crate::bootstrap::app_context::AppContext;
use crate::bootstrap::config::Config;
use crate::domain::users::user::UserRecord;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    #[serde(rename = "$id")]
    pub id: String,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub avatar: String,
    #[serde(rename = "accountId", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl From<UserRecord> for UserResponse {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            avatar: u.avatar,
            account_id: u.account_id,
        }
    }
}

/// Token claims; `sub` is the identity provider's account id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new().route("/me", get(me)).with_state(ctx)
}

#[utoipa::path(get, path = "/api/me", tag = "Auth", responses(
    (status = 200, body = UserResponse),
    (status = 401, description = "Missing token or unknown account")
))]
pub async fn me(
    State(ctx): State<AppContext>,
    bearer: Result<Bearer, StatusCode>,
) -> Result<Json<UserResponse>, StatusCode> {
    let session = session_from_bearer(&ctx.cfg, bearer?)?;
    let users = ctx.user_directory();
    let uc = GetMe {
        users: users.as_ref(),
    };
    let row = uc
        .execute(&session)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, account_id = %session.account_id, "get_me_failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(Json(row.into()))
}

// --- Bearer extractor & JWT utils ---

pub struct Bearer(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // 1) Prefer Authorization header if present
        if let Some(t) = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|auth| auth.strip_prefix("Bearer "))
        {
            return Ok(Bearer(t.to_string()));
        }

        // 2) Fallback to HttpOnly cookie `access_token`
        if let Some(token) = parts
            .headers
            .get(axum::http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|cookie_hdr| get_cookie(cookie_hdr, "access_token"))
        {
            return Ok(Bearer(token));
        }

        Err(StatusCode::UNAUTHORIZED)
    }
}

pub(crate) fn validate_bearer(cfg: &Config, bearer: Bearer) -> Result<String, StatusCode> {
    let data = jsonwebtoken::decode::<Claims>(
        &bearer.0,
        &DecodingKey::from_secret(cfg.jwt_secret_pem.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;
    Ok(data.claims.sub)
}

pub fn session_from_bearer(cfg: &Config, bearer: Bearer) -> Result<Session, StatusCode> {
    let account_id = validate_bearer(cfg, bearer)?;
    if account_id.trim().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Session { account_id })
}

fn get_cookie(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|part| {
        let (k, v) = part.trim().split_once('=')?;
        (k.trim() == name).then(|| v.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;
    use crate::bootstrap::config::Config;

    fn cfg() -> Config {
        Config::from_lookup(|k| match k {
            "DOCUMENT_BACKEND" | "OBJECT_BACKEND" => Some("memory".into()),
            "JWT_SECRET" => Some("unit-test-secret".into()),
            _ => None,
        })
        .unwrap()
    }

    fn token(secret: &str, sub: &str) -> String {
        let claims = Claims {
            sub: sub.into(),
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let session = session_from_bearer(&cfg(), Bearer(token("unit-test-secret", "acc-a"))).unwrap();
        assert_eq!(session.account_id, "acc-a");
    }

    #[test]
    fn rejects_foreign_signature() {
        let err = session_from_bearer(&cfg(), Bearer(token("other-secret", "acc-a"))).unwrap_err();
        assert_eq!(err, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn reads_access_token_cookie() {
        assert_eq!(
            get_cookie("theme=dark; access_token=abc.def ; x=1", "access_token").as_deref(),
            Some("abc.def")
        );
        assert_eq!(get_cookie("theme=dark", "access_token"), None);
    }
}
