//! POST /send-message

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use tracing::{error, info};

use super::body::JsonBody;
use crate::client::OutgoingMessage;
use crate::error::{Error, Result};
use crate::AppState;

/// Message fields of the request body
///
/// `userId` is read separately so that the session check runs before any
/// field of this struct is validated.
#[derive(Debug, Default)]
pub struct SendMessageRequest {
    /// Username, phone number or numeric id; numbers are taken as text
    pub recipient: Option<String>,
    pub message: Option<String>,
    /// Local file path; empty means no attachment
    pub attachment: Option<String>,
}

impl SendMessageRequest {
    /// 400 when a field has a type other than string, number or null
    pub fn from_fields(body: &JsonBody) -> Result<Self> {
        Ok(Self {
            recipient: body.text("recipient")?,
            message: body.text("message")?,
            attachment: body.text("attachment")?,
        })
    }

    /// Validate required fields and build the outgoing message
    fn into_outgoing(self) -> Result<(String, OutgoingMessage)> {
        let recipient = self
            .recipient
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| Error::BadRequest("recipient is required".into()))?;
        let text = self
            .message
            .ok_or_else(|| Error::BadRequest("message is required".into()))?;

        let mut outgoing = OutgoingMessage::text(text);
        if let Some(path) = self.attachment.filter(|a| !a.is_empty()) {
            outgoing = outgoing.with_attachment(path);
        }
        Ok((recipient, outgoing))
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message: String,
}

/// POST /send-message
///
/// 401 when no session is stored for `userId` (no connection is opened),
/// 400 for missing or wrongly typed fields, 500 when connecting or sending
/// fails.
pub async fn send_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SendMessageResponse>> {
    let body = JsonBody::parse(&body);

    let user_id = body.account_id("userId").ok_or(Error::SessionNotFound)?;
    let session = state
        .sessions
        .get(user_id)
        .await
        .ok_or(Error::SessionNotFound)?;

    let (recipient, outgoing) = SendMessageRequest::from_fields(&body)?.into_outgoing()?;
    let has_attachment = outgoing.attachment.is_some();

    let result = async {
        let client = state.clients.connect(Some(&session)).await?;
        client.send_message(&recipient, outgoing).await
    }
    .await;

    match result {
        Ok(()) => {
            info!(
                "Message sent for account {} to {}{}",
                user_id,
                recipient,
                if has_attachment { " (with attachment)" } else { "" }
            );
            Ok(Json(SendMessageResponse {
                message: "Message sent successfully".to_string(),
            }))
        }
        Err(e) => {
            error!("Send message error for account {}: {}", user_id, e);
            Err(Error::Operation(e.to_string()))
        }
    }
}
