//! Earth Engine credentials and session start-up.
//!
//! A session is established once before the server starts. With `EE_KEY_FILE`
//! the service account key is used directly. Otherwise application default
//! credentials are tried silently; if that fails an interactive
//! `gcloud auth application-default login` is run and the silent path is
//! retried once. Every start-up failure surfaces as
//! [`GeoroiError::ImageryInit`].

use chrono::{DateTime, Duration, Utc};
use georoi_core::config::{EE_KEY_FILE, EE_PROJECT};
use georoi_core::error::{GeoroiError, Result};
use georoi_core::Settings;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const EARTH_ENGINE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/earthengine",
    "https://www.googleapis.com/auth/cloud-platform",
];

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
// Refresh slightly before the platform would reject the token
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Service account JSON key
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// OAuth user credentials with a refresh token
#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("refresh_token", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl Credentials {
    /// Load a service account key file.
    ///
    /// The file must exist, be JSON, and contain `client_email`.
    pub fn from_key_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GeoroiError::ConfigInvalid {
                key: EE_KEY_FILE.to_string(),
                reason: format!("key file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content).map_err(|e| {
            GeoroiError::ConfigInvalid {
                key: EE_KEY_FILE.to_string(),
                reason: format!("key file is not valid JSON: {}", e),
            }
        })?;

        if value.get("client_email").and_then(Value::as_str).is_none() {
            return Err(GeoroiError::ConfigInvalid {
                key: EE_KEY_FILE.to_string(),
                reason: "invalid JSON key: client_email is missing".to_string(),
            });
        }

        let key: ServiceAccountKey =
            serde_json::from_value(value).map_err(|e| GeoroiError::ConfigInvalid {
                key: EE_KEY_FILE.to_string(),
                reason: format!("invalid JSON key: {}", e),
            })?;

        Ok(Credentials::ServiceAccount(key))
    }

    /// Interpret an application default credentials document.
    ///
    /// gcloud writes a `type` field; the Earth Engine credentials file does
    /// not, so anything carrying a refresh token is taken as a user credential.
    pub fn from_json(value: Value) -> Result<Self> {
        let is_service_account =
            value.get("type").and_then(Value::as_str) == Some("service_account");

        if is_service_account {
            let key: ServiceAccountKey = serde_json::from_value(value)?;
            return Ok(Credentials::ServiceAccount(key));
        }

        if value.get("refresh_token").is_some() {
            let user: AuthorizedUser = serde_json::from_value(value)?;
            return Ok(Credentials::AuthorizedUser(user));
        }

        Err(GeoroiError::Format {
            format: "credentials".to_string(),
            message: "neither a service account key nor an authorized user".to_string(),
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(serde_json::from_str(&content)?)
    }

    /// Identity the session acts as
    pub fn principal(&self) -> &str {
        match self {
            Credentials::ServiceAccount(key) => &key.client_email,
            Credentials::AuthorizedUser(_) => "authorized user",
        }
    }

    fn token_uri(&self) -> &str {
        match self {
            Credentials::ServiceAccount(key) => &key.token_uri,
            Credentials::AuthorizedUser(user) => &user.token_uri,
        }
    }

    /// Signed RS256 assertion for the JWT bearer grant
    pub fn assertion(&self, now: i64) -> Result<String> {
        let Credentials::ServiceAccount(key) = self else {
            return Err(GeoroiError::ConfigInvalid {
                key: EE_KEY_FILE.to_string(),
                reason: "assertions are only issued for service accounts".to_string(),
            });
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = key.private_key_id.clone();

        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: EARTH_ENGINE_SCOPES.join(" "),
            aud: &key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            GeoroiError::ConfigInvalid {
                key: EE_KEY_FILE.to_string(),
                reason: format!("private key is not a valid RSA PEM: {}", e),
            }
        })?;

        jsonwebtoken::encode(&header, &claims, &encoding_key)
            .map_err(|e| GeoroiError::Remote(format!("Failed to sign token assertion: {}", e)))
    }

    /// Form body for the token endpoint
    fn token_request(&self, now: i64) -> Result<String> {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        match self {
            Credentials::ServiceAccount(_) => {
                form.append_pair("grant_type", JWT_BEARER_GRANT);
                form.append_pair("assertion", &self.assertion(now)?);
            }
            Credentials::AuthorizedUser(user) => {
                form.append_pair("grant_type", "refresh_token");
                form.append_pair("client_id", &user.client_id);
                form.append_pair("client_secret", &user.client_secret);
                form.append_pair("refresh_token", &user.refresh_token);
            }
        }
        Ok(form.finish())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Authenticated Earth Engine session bound to a cloud project
pub struct Session {
    project: String,
    credentials: Credentials,
    http: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("project", &self.project)
            .field("principal", &self.credentials.principal())
            .finish()
    }
}

impl Session {
    pub fn new(project: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            project: project.into(),
            credentials,
            http: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Current access token, refreshed from the stored credentials when it
    /// is about to expire
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let now = Utc::now();
        let body = self.credentials.token_request(now.timestamp())?;
        let token_uri = self.credentials.token_uri();

        let response = self
            .http
            .post(token_uri)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| GeoroiError::Remote(format!("Failed to reach {}: {}", token_uri, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeoroiError::Remote(format!(
                "Token endpoint error ({}): {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GeoroiError::Remote(format!("Failed to parse token response: {}", e)))?;

        tracing::debug!(
            principal = %self.credentials.principal(),
            expires_in = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS),
            "Obtained access token"
        );

        Ok(AccessToken {
            value: token.access_token,
            expires_at: now
                + Duration::seconds(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS)),
        })
    }
}

/// Start-up behaviour
#[derive(Debug, Clone, Copy)]
pub struct InitOptions {
    /// Run `gcloud auth application-default login` when silent auth fails
    pub interactive: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self { interactive: true }
    }
}

/// Establish the session described by `settings`
pub async fn init_session(settings: &Settings, options: InitOptions) -> Result<Session> {
    establish(settings, options).await.map_err(wrap_init_error)
}

fn wrap_init_error(err: GeoroiError) -> GeoroiError {
    match err {
        GeoroiError::ImageryInit { .. } => err,
        other => GeoroiError::ImageryInit {
            kind: other.kind().to_string(),
            message: other.to_string(),
        },
    }
}

async fn establish(settings: &Settings, options: InitOptions) -> Result<Session> {
    let project = settings.ee_project.as_str();
    if project.is_empty() {
        return Err(GeoroiError::ConfigMissing {
            key: EE_PROJECT.to_string(),
        });
    }

    if let Some(key_file) = &settings.ee_key_file {
        let credentials = Credentials::from_key_file(key_file)?;

        if let Some(configured) = &settings.ee_service_account {
            if configured != credentials.principal() {
                tracing::warn!(
                    configured = %configured,
                    key_file_account = %credentials.principal(),
                    "EE_SERVICE_ACCOUNT differs from the key file; using the key file identity"
                );
            }
        }

        let session = Session::new(project, credentials);
        session.access_token().await?;
        tracing::info!(
            project = %project,
            principal = %session.credentials().principal(),
            "Earth Engine session ready"
        );
        return Ok(session);
    }

    match silent_session(project, &default_credential_paths()).await {
        Ok(session) => Ok(session),
        Err(err) if options.interactive => {
            tracing::warn!(
                error = %err,
                "Silent authentication failed, starting interactive login"
            );
            run_interactive_login().await?;
            // The login writes the gcloud ADC file; stale files earlier in the search order
            // must not shadow it
            let written: Vec<PathBuf> = gcloud_adc_path().into_iter().collect();
            silent_session(project, &written).await
        }
        Err(err) => Err(err),
    }
}

/// First candidate that parses and yields an access token
async fn silent_session(project: &str, paths: &[PathBuf]) -> Result<Session> {
    let mut last_error = None;

    for (path, credentials) in load_default_credentials(paths) {
        let session = Session::new(project, credentials);
        match session.access_token().await {
            Ok(_) => {
                tracing::info!(
                    project = %project,
                    principal = %session.credentials().principal(),
                    path = %path.display(),
                    "Earth Engine session ready"
                );
                return Ok(session);
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Credentials rejected, trying next"
                );
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| GeoroiError::ConfigMissing {
        key: "application default credentials".to_string(),
    }))
}

/// Candidate locations for application default credentials, in lookup order
pub fn default_credential_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(explicit) = non_empty_env("GOOGLE_APPLICATION_CREDENTIALS") {
        paths.push(PathBuf::from(explicit));
    }

    if let Some(home) = non_empty_env("HOME").or_else(|| non_empty_env("USERPROFILE")) {
        paths.push(Path::new(&home).join(".config/earthengine/credentials"));
    }

    paths.extend(gcloud_adc_path());
    paths
}

/// Where `gcloud auth application-default login` writes its credentials
fn gcloud_adc_path() -> Option<PathBuf> {
    let gcloud_dir = non_empty_env("CLOUDSDK_CONFIG").map(PathBuf::from).or_else(|| {
        if cfg!(windows) {
            non_empty_env("APPDATA").map(|appdata| Path::new(&appdata).join("gcloud"))
        } else {
            non_empty_env("HOME").map(|home| Path::new(&home).join(".config/gcloud"))
        }
    });
    gcloud_dir.map(|dir| dir.join("application_default_credentials.json"))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Parse every existing candidate in order, skipping unusable files
fn load_default_credentials(paths: &[PathBuf]) -> Vec<(PathBuf, Credentials)> {
    paths
        .iter()
        .filter(|path| path.exists())
        .filter_map(|path| match Credentials::from_path(path) {
            Ok(credentials) => Some((path.clone(), credentials)),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Skipping unusable credentials file"
                );
                None
            }
        })
        .collect()
}

async fn run_interactive_login() -> Result<()> {
    let scopes = format!("--scopes={}", EARTH_ENGINE_SCOPES.join(","));
    let status = tokio::process::Command::new("gcloud")
        .args(["auth", "application-default", "login", scopes.as_str()])
        .status()
        .await?;

    if status.success() {
        Ok(())
    } else {
        Err(GeoroiError::Remote(format!("gcloud login exited with {}", status)))
    }
}
