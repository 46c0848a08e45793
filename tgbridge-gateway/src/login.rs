//! Per-request QR login handler
//!
//! A [`QrLoginAttempt`] lives exactly as long as one `/authorize` call. It
//! owns the attempt's QR artifact, so with delete-on-completion retention the
//! image disappears when the attempt is dropped.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

use crate::client::{ClientError, LoginChallenge, LoginControl, QrLoginHandler};
use crate::qr::QrArtifact;

pub struct QrLoginAttempt {
    artifact: QrArtifact,
    password: Option<String>,
    challenges: AtomicUsize,
}

impl QrLoginAttempt {
    pub fn new(artifact: QrArtifact, password: Option<String>) -> Self {
        Self {
            artifact,
            password: password.filter(|p| !p.is_empty()),
            challenges: AtomicUsize::new(0),
        }
    }

    pub fn artifact(&self) -> &QrArtifact {
        &self.artifact
    }

    /// Number of challenges rendered so far
    pub fn challenge_count(&self) -> usize {
        self.challenges.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl QrLoginHandler for QrLoginAttempt {
    async fn on_challenge(&self, challenge: &LoginChallenge) -> Result<(), ClientError> {
        self.artifact.write_challenge(&challenge.deep_link()).await?;
        let n = self.challenges.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "QR code generated: {} (challenge {}, expires {})",
            self.artifact.path().display(),
            n,
            challenge.expires_at.to_rfc3339()
        );
        Ok(())
    }

    async fn on_error(&self, error: &ClientError) -> LoginControl {
        warn!("QR login error: {}", error);
        LoginControl::Stop
    }

    async fn on_password_request(&self, hint: Option<&str>) -> Result<String, ClientError> {
        match &self.password {
            Some(password) => Ok(password.clone()),
            None => Err(ClientError::PasswordRequired {
                hint: hint.map(str::to_owned),
            }),
        }
    }
}
