//! Scripted messaging client for router tests
//!
//! `MockFactory` records every connect and every send so tests can assert on
//! what the gateway asked the client library to do.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tgbridge_common::config::QrRetentionMode;
use tgbridge_gateway::client::{
    AccountId, ClientError, ClientFactory, LoginChallenge, LoginControl, MessagingClient,
    OutgoingMessage, QrLoginHandler, SessionToken,
};
use tgbridge_gateway::qr::QrStore;
use tgbridge_gateway::session_store::{MemorySessionStore, SessionStore};
use tgbridge_gateway::{build_router, AppState};

pub const TEST_USER: i64 = 555;
pub const TEST_TOKEN: &str = "<opaque>";

/// How the scripted client behaves
#[derive(Debug, Clone)]
pub struct Script {
    pub user_id: i64,
    pub session: String,
    /// Number of QR challenges emitted before the scan "succeeds"
    pub challenges: usize,
    /// `Some(hint)` when the account has 2FA enabled
    pub two_factor: Option<Option<String>>,
    pub password: String,
    /// Reported to the handler's `on_error` during QR login
    pub login_error: Option<String>,
    /// QR login never completes
    pub hang: bool,
    pub connect_error: Option<String>,
    pub send_error: Option<String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            user_id: TEST_USER,
            session: TEST_TOKEN.to_string(),
            challenges: 1,
            two_factor: None,
            password: "hunter2".to_string(),
            login_error: None,
            hang: false,
            connect_error: None,
            send_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub session: Option<SessionToken>,
    pub recipient: String,
    pub message: OutgoingMessage,
}

#[derive(Default)]
pub struct Recorder {
    pub connects: Mutex<Vec<Option<SessionToken>>>,
    pub sent: Mutex<Vec<SentMessage>>,
}

impl Recorder {
    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

pub struct MockFactory {
    script: Mutex<Script>,
    pub recorder: Arc<Recorder>,
}

impl MockFactory {
    pub fn new(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            recorder: Arc::new(Recorder::default()),
        }
    }

    /// Change behavior for subsequent connections
    pub fn rescript(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn connect(
        &self,
        session: Option<&SessionToken>,
    ) -> Result<Box<dyn MessagingClient>, ClientError> {
        self.recorder.connects.lock().unwrap().push(session.cloned());
        let script = self.script.lock().unwrap().clone();
        if let Some(message) = &script.connect_error {
            return Err(ClientError::Connection(message.clone()));
        }
        Ok(Box::new(MockClient {
            script,
            session: session.cloned(),
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

pub struct MockClient {
    script: Script,
    session: Option<SessionToken>,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl MessagingClient for MockClient {
    async fn sign_in_with_qr(&self, handler: &dyn QrLoginHandler) -> Result<(), ClientError> {
        for i in 0..self.script.challenges {
            let challenge = LoginChallenge::new(
                vec![i as u8; 32],
                Utc::now() + ChronoDuration::seconds(30),
            );
            handler.on_challenge(&challenge).await?;
        }

        if let Some(message) = &self.script.login_error {
            let error = ClientError::LoginAborted(message.clone());
            if handler.on_error(&error).await == LoginControl::Stop {
                return Err(error);
            }
        }

        if self.script.hang {
            std::future::pending::<()>().await;
        }

        if let Some(hint) = &self.script.two_factor {
            let password = handler.on_password_request(hint.as_deref()).await?;
            if password != self.script.password {
                return Err(ClientError::Rpc("RPC 400: PASSWORD_HASH_INVALID".into()));
            }
        }
        Ok(())
    }

    async fn current_user(&self) -> Result<AccountId, ClientError> {
        Ok(AccountId(self.script.user_id))
    }

    async fn send_message(
        &self,
        recipient: &str,
        message: OutgoingMessage,
    ) -> Result<(), ClientError> {
        if let Some(error) = &self.script.send_error {
            return Err(ClientError::Rpc(error.clone()));
        }
        self.recorder.sent.lock().unwrap().push(SentMessage {
            session: self.session.clone(),
            recipient: recipient.to_string(),
            message,
        });
        Ok(())
    }

    async fn save_session(&self) -> Result<SessionToken, ClientError> {
        Ok(SessionToken::new(self.script.session.clone()))
    }
}

/// Router plus handles on everything behind it
pub struct TestApp {
    pub router: Router,
    pub factory: Arc<MockFactory>,
    pub sessions: Arc<MemorySessionStore>,
    pub qr: Arc<QrStore>,
    pub qr_root: TempDir,
}

impl TestApp {
    pub fn recorder(&self) -> &Recorder {
        &self.factory.recorder
    }

    /// Number of `.png` files currently in the QR directory
    pub fn qr_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.qr.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".png"))
            .collect();
        names.sort();
        names
    }
}

pub async fn setup_app(script: Script) -> TestApp {
    setup_app_with(script, QrRetentionMode::DeleteOnCompletion, Duration::from_secs(5)).await
}

pub async fn setup_app_with(
    script: Script,
    retention: QrRetentionMode,
    login_timeout: Duration,
) -> TestApp {
    let qr_root = TempDir::new().unwrap();
    let qr = Arc::new(
        QrStore::init(qr_root.path().join("qrcodes"), retention, Duration::from_secs(600))
            .await
            .unwrap(),
    );
    let factory = Arc::new(MockFactory::new(script));
    let sessions = Arc::new(MemorySessionStore::new());

    let state = AppState::new(
        Arc::clone(&sessions) as Arc<dyn SessionStore>,
        Arc::clone(&factory) as Arc<dyn ClientFactory>,
        Arc::clone(&qr),
        login_timeout,
    );

    TestApp {
        router: build_router(state),
        factory,
        sessions,
        qr,
        qr_root,
    }
}

pub fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn raw_request(method: &str, uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body))
        .unwrap()
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
