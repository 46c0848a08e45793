//! POST /authorize
//!
//! Runs a QR login on a fresh client and stores the resulting session under
//! the authenticated account id.

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::body::JsonBody;
use crate::client::{AccountId, ClientError, QrLoginHandler, SessionToken};
use crate::error::{Error, Result};
use crate::login::QrLoginAttempt;
use crate::AppState;

/// Request body; every field is optional
#[derive(Debug, Default)]
pub struct AuthorizeRequest {
    /// 2FA password, used only if the platform asks for one
    pub password: Option<String>,
}

impl AuthorizeRequest {
    /// Missing or unparsable bodies count as `{}`
    ///
    /// A numeric password is taken as its decimal text. Any other non-string
    /// password is ignored rather than failing the login up front.
    pub fn from_body(body: &[u8]) -> Self {
        let password = JsonBody::parse(body).text("password").unwrap_or_else(|e| {
            debug!("Ignoring /authorize password: {}", e);
            None
        });
        Self { password }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeResponse {
    pub message: String,
    pub session_string: SessionToken,
    pub user_id: AccountId,
}

/// POST /authorize
///
/// 200 with the session token and account id, 401 `{"error"}` on any failure.
pub async fn authorize(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AuthorizeResponse>> {
    let request = AuthorizeRequest::from_body(&body);
    let attempt = QrLoginAttempt::new(state.qr.allocate(), request.password);

    let outcome = tokio::time::timeout(state.login_timeout, qr_login(&state, &attempt))
        .await
        .unwrap_or(Err(ClientError::Timeout(state.login_timeout)));

    match outcome {
        Ok((user_id, token)) => {
            if state.sessions.put(user_id, token.clone()).await.is_some() {
                info!("Account {} re-authorized, previous session replaced", user_id);
            } else {
                info!("Account {} authorized and saved", user_id);
            }
            Ok(Json(AuthorizeResponse {
                message: "Authorized via QR".to_string(),
                session_string: token,
                user_id,
            }))
        }
        Err(e) => {
            warn!(
                "Authorization failed after {} QR challenge(s): {}",
                attempt.challenge_count(),
                e
            );
            Err(Error::Authorization(e.to_string()))
        }
    }
}

async fn qr_login(
    state: &AppState,
    handler: &dyn QrLoginHandler,
) -> std::result::Result<(AccountId, SessionToken), ClientError> {
    let client = state.clients.connect(None).await?;
    debug!("Client connected for QR login");

    client.sign_in_with_qr(handler).await?;
    let token = client.save_session().await?;
    let user_id = client.current_user().await?;
    Ok((user_id, token))
}
