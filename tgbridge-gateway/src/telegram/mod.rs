//! Telegram backend over `layer-client`
//!
//! Session token = unpadded base64url of the library's binary session file.
//! Each client keeps that file in its own temporary directory, so restoring a
//! token is "write file, connect" and saving one is "save, read file".

mod srp;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use layer_client::{BinaryFileBackend, Client, InvocationError};
use layer_tl_types as tl;
use layer_tl_types::RemoteCall;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::{
    AccountId, ClientError, ClientFactory, LoginChallenge, LoginControl, MessagingClient,
    OutgoingMessage, QrLoginHandler, SessionToken,
};
use crate::config::ApiCredentials;

const SESSION_FILE: &str = "session.bin";
/// How often the login token is re-exported while waiting for a scan
const QR_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Used when the server sends an unrepresentable expiry
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 30;

// ============================================================================
// Factory
// ============================================================================

/// Opens `layer-client` connections with fixed application credentials
pub struct LayerClientFactory {
    credentials: ApiCredentials,
    connection_retries: u32,
}

impl LayerClientFactory {
    pub fn new(credentials: ApiCredentials, connection_retries: u32) -> Self {
        Self {
            credentials,
            connection_retries,
        }
    }

    fn library_config(&self, session_path: &Path) -> layer_client::Config {
        layer_client::Config {
            api_id: self.credentials.api_id,
            api_hash: self.credentials.api_hash.clone(),
            session_backend: Arc::new(BinaryFileBackend::new(session_path)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ClientFactory for LayerClientFactory {
    async fn connect(
        &self,
        session: Option<&SessionToken>,
    ) -> Result<Box<dyn MessagingClient>, ClientError> {
        let workdir = tempfile::tempdir()?;
        let session_path = workdir.path().join(SESSION_FILE);

        if let Some(token) = session {
            let bytes = URL_SAFE_NO_PAD
                .decode(token.as_str())
                .map_err(|e| ClientError::InvalidSession(e.to_string()))?;
            tokio::fs::write(&session_path, bytes).await?;
        }

        let config = self.library_config(&session_path);
        let client = connect_with_retries(&config, self.connection_retries).await?;
        info!(
            "Client connected ({})",
            if session.is_some() { "restored session" } else { "new session" }
        );

        Ok(Box::new(LayerClient {
            client: RwLock::new(client),
            config,
            credentials: self.credentials.clone(),
            connection_retries: self.connection_retries,
            session_path,
            _workdir: workdir,
        }))
    }
}

async fn connect_with_retries(
    config: &layer_client::Config,
    retries: u32,
) -> Result<Client, ClientError> {
    let attempts = retries.max(1);
    let mut attempt = 1;
    loop {
        match Client::connect(config.clone()).await {
            Ok((client, _shutdown)) => return Ok(client),
            Err(e) if attempt < attempts => {
                warn!("Connect attempt {}/{} failed: {}", attempt, attempts, e);
                sleep(Duration::from_secs(u64::from(attempt))).await;
                attempt += 1;
            }
            Err(e) => return Err(ClientError::Connection(e.to_string())),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct LayerClient {
    /// Replaced once if a QR login completes on another data center
    client: RwLock<Client>,
    config: layer_client::Config,
    credentials: ApiCredentials,
    connection_retries: u32,
    session_path: PathBuf,
    _workdir: TempDir,
}

fn rpc_error(e: InvocationError) -> ClientError {
    match e {
        InvocationError::Io(io) => ClientError::Connection(io.to_string()),
        other => ClientError::Rpc(other.to_string()),
    }
}

/// Invoke on the home DC, or on `dc` when the login migrated there
async fn invoke_at<R: RemoteCall>(
    client: &Client,
    dc: Option<i32>,
    request: &R,
) -> Result<R::Return, InvocationError> {
    match dc {
        Some(dc_id) => client.invoke_on_dc(dc_id, request).await,
        None => client.invoke(request).await,
    }
}

fn token_expiry(expires: i32) -> DateTime<Utc> {
    DateTime::from_timestamp(i64::from(expires), 0)
        .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
}

/// Rewrite the home DC id stored in the session file header
fn rehome_session_file(path: &Path, dc_id: i32) -> std::io::Result<()> {
    let mut bytes = std::fs::read(path)?;
    if bytes.len() < 4 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "truncated session file",
        ));
    }
    bytes[..4].copy_from_slice(&dc_id.to_le_bytes());
    std::fs::write(path, bytes)
}

/// Where a QR poll left off
enum QrStep {
    /// Authorized; `Some(dc)` if on another data center
    Done(Option<i32>),
    /// Still waiting for the scan
    Pending,
}

enum PollError {
    /// Server error, with the DC the request went to when not home
    Rpc(InvocationError, Option<i32>),
    /// The login handler failed
    Handler(ClientError),
}

impl LayerClient {
    async fn client(&self) -> Client {
        self.client.read().await.clone()
    }

    async fn poll_login_token(
        &self,
        client: &Client,
        handler: &dyn QrLoginHandler,
        shown: &mut Option<Vec<u8>>,
    ) -> Result<QrStep, PollError> {
        let export = tl::functions::auth::ExportLoginToken {
            api_id: self.credentials.api_id,
            api_hash: self.credentials.api_hash.clone(),
            except_ids: vec![],
        };
        let result = client
            .invoke(&export)
            .await
            .map_err(|e| PollError::Rpc(e, None))?;

        match result {
            tl::enums::auth::LoginToken::LoginToken(t) => {
                if shown.as_deref() != Some(t.token.as_slice()) {
                    let challenge = LoginChallenge::new(t.token.clone(), token_expiry(t.expires));
                    handler
                        .on_challenge(&challenge)
                        .await
                        .map_err(PollError::Handler)?;
                    *shown = Some(t.token);
                }
                Ok(QrStep::Pending)
            }
            tl::enums::auth::LoginToken::MigrateTo(m) => {
                debug!("QR login continues on DC{}", m.dc_id);
                let import = tl::functions::auth::ImportLoginToken { token: m.token };
                match client.invoke_on_dc(m.dc_id, &import).await {
                    Ok(tl::enums::auth::LoginToken::Success(_)) => Ok(QrStep::Done(Some(m.dc_id))),
                    Ok(_) => Ok(QrStep::Pending),
                    Err(e) => Err(PollError::Rpc(e, Some(m.dc_id))),
                }
            }
            tl::enums::auth::LoginToken::Success(_) => Ok(QrStep::Done(None)),
        }
    }

    async fn check_password(
        &self,
        client: &Client,
        dc: Option<i32>,
        handler: &dyn QrLoginHandler,
    ) -> Result<(), ClientError> {
        let password = invoke_at(client, dc, &tl::functions::account::GetPassword {})
            .await
            .map_err(rpc_error)?;
        let tl::enums::account::Password::Password(password) = password;

        let secret = handler.on_password_request(password.hint.as_deref()).await?;

        let algo = password
            .current_algo
            .ok_or_else(|| ClientError::Rpc("account has no password algorithm".into()))?;
        let tl::enums::PasswordKdfAlgo::Sha256Sha256Pbkdf2Hmacsha512iter100000Sha256ModPow(algo) =
            algo
        else {
            return Err(ClientError::Rpc("unsupported password algorithm".into()));
        };
        let g_b = password
            .srp_b
            .ok_or_else(|| ClientError::Rpc("missing srp_B".into()))?;
        let srp_id = password
            .srp_id
            .ok_or_else(|| ClientError::Rpc("missing srp_id".into()))?;

        let proof = srp::compute_proof(
            &srp::SrpParams {
                salt1: &algo.salt1,
                salt2: &algo.salt2,
                p: &algo.p,
                g: algo.g,
                g_b: &g_b,
                a: &password.secure_random,
            },
            secret.as_bytes(),
        );

        let check = tl::functions::auth::CheckPassword {
            password: tl::enums::InputCheckPasswordSrp::InputCheckPasswordSrp(
                tl::types::InputCheckPasswordSrp {
                    srp_id,
                    a: proof.g_a.to_vec(),
                    m1: proof.m1.to_vec(),
                },
            ),
        };
        invoke_at(client, dc, &check).await.map_err(rpc_error)?;
        info!("2FA password accepted");
        Ok(())
    }

    /// Make `dc_id` the home DC of this client's session
    async fn rehome(&self, client: &Client, dc_id: i32) -> Result<(), ClientError> {
        client.save_session().await.map_err(rpc_error)?;
        rehome_session_file(&self.session_path, dc_id)?;
        let reconnected = connect_with_retries(&self.config, self.connection_retries).await?;
        *self.client.write().await = reconnected;
        info!("Session moved to DC{}", dc_id);
        Ok(())
    }
}

#[async_trait]
impl MessagingClient for LayerClient {
    async fn sign_in_with_qr(&self, handler: &dyn QrLoginHandler) -> Result<(), ClientError> {
        let client = self.client().await;
        let mut shown: Option<Vec<u8>> = None;

        let home_dc = loop {
            match self.poll_login_token(&client, handler, &mut shown).await {
                Ok(QrStep::Done(dc)) => break dc,
                Ok(QrStep::Pending) => sleep(QR_POLL_INTERVAL).await,
                Err(PollError::Rpc(e, dc)) if e.is("SESSION_PASSWORD_NEEDED") => {
                    self.check_password(&client, dc, handler).await?;
                    break dc;
                }
                Err(PollError::Handler(e)) => return Err(e),
                Err(PollError::Rpc(e, _)) => {
                    let error = ClientError::LoginAborted(e.to_string());
                    match handler.on_error(&error).await {
                        LoginControl::Stop => return Err(error),
                        LoginControl::Continue => sleep(QR_POLL_INTERVAL).await,
                    }
                }
            }
        };

        if let Some(dc_id) = home_dc {
            self.rehome(&client, dc_id).await?;
        }
        Ok(())
    }

    async fn current_user(&self) -> Result<AccountId, ClientError> {
        let me = self.client().await.get_me().await.map_err(rpc_error)?;
        Ok(AccountId(me.id))
    }

    async fn send_message(
        &self,
        recipient: &str,
        message: OutgoingMessage,
    ) -> Result<(), ClientError> {
        let client = self.client().await;

        let Some(path) = message.attachment else {
            return client
                .send_message(recipient, &message.text)
                .await
                .map(|_| ())
                .map_err(rpc_error);
        };

        let data = tokio::fs::read(&path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let mime = mime_guess::from_path(&path).first_or_octet_stream();

        let uploaded = client
            .upload_file(&data, &name, mime.essence_str())
            .await
            .map_err(rpc_error)?;
        let peer = client.resolve_peer(recipient).await.map_err(rpc_error)?;
        client
            .send_file(peer, uploaded.as_document_media(), &message.text)
            .await
            .map_err(rpc_error)
    }

    async fn save_session(&self) -> Result<SessionToken, ClientError> {
        self.client().await.save_session().await.map_err(rpc_error)?;
        let bytes = tokio::fs::read(&self.session_path).await?;
        Ok(SessionToken::new(URL_SAFE_NO_PAD.encode(bytes)))
    }
}
