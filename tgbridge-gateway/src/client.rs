//! Messaging client seam
//!
//! Everything protocol-level (connection setup, QR challenge/response,
//! encryption, transport) lives behind these traits. The gateway only
//! orchestrates calls to them; the Telegram implementation is in
//! [`crate::telegram`] (feature `telegram`), tests plug in scripted fakes.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================

/// Account identifier issued by the messaging platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(AccountId)
    }
}

/// Accepts both `555` and `"555"`
impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(AccountId(n)),
            Raw::Text(s) => s
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid account id: {s:?}"))),
        }
    }
}

/// Opaque serialized session produced by the client library
///
/// `Debug` never prints the contents.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(<{} bytes>)", self.0.len())
    }
}

// ============================================================================
// Login challenge
// ============================================================================

/// One QR login challenge emitted by the platform
///
/// Challenges are refreshed before they expire; every refresh is a new
/// `LoginChallenge` with a new token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginChallenge {
    pub token: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

impl LoginChallenge {
    pub fn new(token: Vec<u8>, expires_at: DateTime<Utc>) -> Self {
        Self { token, expires_at }
    }

    /// Deep link scanned by the official app: `tg://login?token=<base64url>`
    pub fn deep_link(&self) -> String {
        format!("tg://login?token={}", URL_SAFE_NO_PAD.encode(&self.token))
    }
}

/// Returned from [`QrLoginHandler::on_error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginControl {
    /// Abort the sign-in; the client returns the reported error
    Stop,
    /// Keep waiting for the next challenge
    Continue,
}

// ============================================================================
// Outgoing message
// ============================================================================

/// Message handed to [`MessagingClient::send_message`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    /// Local file sent along with the text; `None` sends text only
    pub attachment: Option<PathBuf>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(path.into());
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by a messaging client or a login handler
#[derive(Error, Debug)]
pub enum ClientError {
    /// Could not establish or restore a connection
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Platform rejected a request; text is passed through as-is
    #[error("{0}")]
    Rpc(String),

    /// QR sign-in aborted by the login handler
    #[error("QR login aborted: {0}")]
    LoginAborted(String),

    /// Platform asked for the 2FA password and the caller did not supply one
    #[error("2FA password required but not provided{}", hint_suffix(.hint))]
    PasswordRequired { hint: Option<String> },

    /// Stored session could not be decoded
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// QR sign-in did not complete in time
    #[error("QR login timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// QR image could not be produced
    #[error("QR code rendering failed: {0}")]
    QrRender(String),

    /// File I/O errors (attachments, QR images)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tab-separated so callers can split the hint off the fixed message
fn hint_suffix(hint: &Option<String>) -> String {
    match hint.as_deref() {
        Some(h) if !h.is_empty() => format!("\tHint: {h}"),
        _ => String::new(),
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Callbacks driven by [`MessagingClient::sign_in_with_qr`]
///
/// One implementation instance per authorization attempt.
#[async_trait]
pub trait QrLoginHandler: Send + Sync {
    /// A new (or refreshed) challenge is ready to be shown to the user
    async fn on_challenge(&self, challenge: &LoginChallenge) -> Result<(), ClientError>;

    /// The sign-in hit an error; decide whether to give up
    async fn on_error(&self, error: &ClientError) -> LoginControl;

    /// The account has 2FA enabled; return the password or fail the attempt
    async fn on_password_request(&self, hint: Option<&str>) -> Result<String, ClientError>;
}

/// A connected client bound to at most one account
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Run the QR login flow to completion
    async fn sign_in_with_qr(&self, handler: &dyn QrLoginHandler) -> Result<(), ClientError>;

    /// Account the client is signed in as
    async fn current_user(&self) -> Result<AccountId, ClientError>;

    /// Send a message to `recipient` (`@username`, numeric id, or `me`)
    async fn send_message(
        &self,
        recipient: &str,
        message: OutgoingMessage,
    ) -> Result<(), ClientError>;

    /// Serialize the session so it can be restored by [`ClientFactory::connect`]
    async fn save_session(&self) -> Result<SessionToken, ClientError>;
}

/// Opens connections to the messaging platform
///
/// Holds the platform application credentials.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Connect a client, restoring `session` when given
    async fn connect(
        &self,
        session: Option<&SessionToken>,
    ) -> Result<Box<dyn MessagingClient>, ClientError>;
}
