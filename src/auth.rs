//! Header-based request authentication.
//!
//! Two credential kinds: the shared admin secret, and per-client id+token
//! pairs issued at client creation. The admin path lazily provisions the
//! single primary client so a fresh install is usable with only the secret.

use actix_web::{http::StatusCode, HttpRequest, HttpResponse, ResponseError};
use std::fmt;

use crate::db::Database;

pub const ADMIN_SECRET_HEADER: &str = "X-Orty-Secret";
pub const CLIENT_ID_HEADER: &str = "X-Orty-Client-Id";
pub const CLIENT_TOKEN_HEADER: &str = "X-Orty-Client-Token";

#[derive(Debug)]
pub enum AuthError {
    /// Missing or invalid credentials
    Unauthorized,
    /// Valid credentials, but the resource belongs to another client
    Forbidden,
    Database(rusqlite::Error),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Unauthorized => write!(f, "Unauthorized"),
            AuthError::Forbidden => write!(f, "Forbidden"),
            AuthError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<rusqlite::Error> for AuthError {
    fn from(e: rusqlite::Error) -> Self {
        AuthError::Database(e)
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

/// Resolved identity of the caller. Admin requests act as the primary
/// client for ownership purposes.
pub struct RequestAuth {
    pub client_id: String,
    pub is_admin: bool,
}

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Resolve caller identity from request headers. Admin secret wins when it
/// matches; otherwise client id+token are verified against the stored hash.
pub fn authenticate(
    req: &HttpRequest,
    db: &Database,
    shared_secret: &str,
) -> Result<RequestAuth, AuthError> {
    if let Some(secret) = header_value(req, ADMIN_SECRET_HEADER) {
        if secret == shared_secret {
            let client_id = ensure_primary_client(db)?;
            return Ok(RequestAuth {
                client_id,
                is_admin: true,
            });
        }
    }

    if let (Some(client_id), Some(token)) = (
        header_value(req, CLIENT_ID_HEADER),
        header_value(req, CLIENT_TOKEN_HEADER),
    ) {
        if db.verify_client_token(client_id, token)? {
            return Ok(RequestAuth {
                client_id: client_id.to_string(),
                is_admin: false,
            });
        }
    }

    Err(AuthError::Unauthorized)
}

/// Admin-only guard for endpoints with no client-facing variant.
pub fn verify_admin_secret(req: &HttpRequest, shared_secret: &str) -> Result<(), AuthError> {
    match header_value(req, ADMIN_SECRET_HEADER) {
        Some(secret) if secret == shared_secret => Ok(()),
        _ => Err(AuthError::Unauthorized),
    }
}

pub fn ensure_bot_owned_or_admin(
    owner_client_id: &str,
    auth: &RequestAuth,
) -> Result<(), AuthError> {
    if auth.is_admin || auth.client_id == owner_client_id {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

fn ensure_primary_client(db: &Database) -> Result<String, AuthError> {
    if let Some(primary) = db.get_primary_client()? {
        return Ok(primary.client_id);
    }

    let created = db.create_client(
        Some("Primary Root Client"),
        Some(serde_json::json!({"role": "root", "ui_default": true})),
        true,
    )?;
    log::info!("Provisioned primary root client {}", created.client_id);
    Ok(created.client_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn admin_request(secret: &str) -> HttpRequest {
        TestRequest::default()
            .insert_header((ADMIN_SECRET_HEADER, secret))
            .to_http_request()
    }

    #[test]
    fn test_admin_secret_provisions_primary_client() {
        let db = Database::new_in_memory().unwrap();
        let req = admin_request("topsecret");

        let auth = authenticate(&req, &db, "topsecret").unwrap();
        assert!(auth.is_admin);

        // Second request reuses the same primary client
        let again = authenticate(&req, &db, "topsecret").unwrap();
        assert_eq!(auth.client_id, again.client_id);

        let primary = db.get_primary_client().unwrap().unwrap();
        assert_eq!(primary.client_id, auth.client_id);
        assert_eq!(primary.name.as_deref(), Some("Primary Root Client"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let db = Database::new_in_memory().unwrap();
        let req = admin_request("guess");
        let result = authenticate(&req, &db, "topsecret");
        assert!(matches!(result, Err(AuthError::Unauthorized)));
        // Failed admin auth must not provision anything
        assert!(db.get_primary_client().unwrap().is_none());
    }

    #[test]
    fn test_client_token_auth() {
        let db = Database::new_in_memory().unwrap();
        let created = db.create_client(Some("Phone"), None, false).unwrap();

        let req = TestRequest::default()
            .insert_header((CLIENT_ID_HEADER, created.client_id.clone()))
            .insert_header((CLIENT_TOKEN_HEADER, created.client_token.clone()))
            .to_http_request();
        let auth = authenticate(&req, &db, "topsecret").unwrap();
        assert!(!auth.is_admin);
        assert_eq!(auth.client_id, created.client_id);

        let bad = TestRequest::default()
            .insert_header((CLIENT_ID_HEADER, created.client_id.clone()))
            .insert_header((CLIENT_TOKEN_HEADER, "wrong-token"))
            .to_http_request();
        assert!(matches!(
            authenticate(&bad, &db, "topsecret"),
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_missing_headers_rejected() {
        let db = Database::new_in_memory().unwrap();
        let req = TestRequest::default().to_http_request();
        assert!(matches!(
            authenticate(&req, &db, "topsecret"),
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_ownership_guard() {
        let admin = RequestAuth {
            client_id: "root".to_string(),
            is_admin: true,
        };
        let owner = RequestAuth {
            client_id: "c1".to_string(),
            is_admin: false,
        };
        let stranger = RequestAuth {
            client_id: "c2".to_string(),
            is_admin: false,
        };

        assert!(ensure_bot_owned_or_admin("c1", &admin).is_ok());
        assert!(ensure_bot_owned_or_admin("c1", &owner).is_ok());
        assert!(matches!(
            ensure_bot_owned_or_admin("c1", &stranger),
            Err(AuthError::Forbidden)
        ));
    }
}
