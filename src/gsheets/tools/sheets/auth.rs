use std::path::Path;
use std::sync::Mutex;

use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use ring::signature::RsaKeyPair;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gsheets::tools::credentials::{CredentialKind, Credentials};
use crate::gsheets::tools::error::{Result, ToolError};

/// Scope granting read and write access to spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const MISSING_EMAIL: &str = "(email missing)";

/// Fields of a service account JSON key used to mint access tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub private_key: String,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Parses the `credentials` secret, which holds either the key JSON or,
    /// on its first line, a path to the key file.
    pub fn from_secret(secret: &str) -> Result<Self> {
        let first_line = secret.lines().next().unwrap_or_default().trim();
        let candidate = Path::new(first_line);
        if !first_line.is_empty() && candidate.is_file() {
            let content = std::fs::read_to_string(candidate)
                .map_err(|err| file_error(first_line, &err))?;
            return serde_json::from_str(&content).map_err(|err| file_error(first_line, &err));
        }
        serde_json::from_str(secret).map_err(|err| {
            ToolError::Credentials(format!("Unable to read the JSON Service Account.\n{err}"))
        })
    }

    /// Address the spreadsheet must be shared with.
    pub fn email(&self) -> &str {
        self.client_email.as_deref().unwrap_or(MISSING_EMAIL)
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// Builds the signed RS256 assertion exchanged for an access token.
    pub fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = JwtClaims {
            iss: self.email(),
            scope: SPREADSHEETS_SCOPE,
            aud: self.token_uri(),
            iat: now.timestamp() as u64,
            exp: (now + Duration::hours(1)).timestamp() as u64,
        };
        let header = JwtHeader {
            alg: "RS256",
            typ: "JWT",
        };

        let header_b64 = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_string(&header)?);
        let claims_b64 = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_string(&claims)?);
        let signing_input = format!("{header_b64}.{claims_b64}");

        let key_pair = self.key_pair()?;
        let mut signature = vec![0; key_pair.public().modulus_len()];
        key_pair
            .sign(
                &ring::signature::RSA_PKCS1_SHA256,
                &ring::rand::SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| ToolError::Auth("failed to sign the token request".into()))?;

        let signature_b64 = BASE64_URL_SAFE_NO_PAD.encode(&signature);
        Ok(format!("{signing_input}.{signature_b64}"))
    }

    fn key_pair(&self) -> Result<RsaKeyPair> {
        let mut reader = std::io::Cursor::new(self.private_key.as_bytes());
        let item = rustls_pemfile::read_one(&mut reader)
            .map_err(|err| ToolError::Auth(format!("invalid PEM private key: {err}")))?;
        match item {
            Some(rustls_pemfile::Item::Pkcs8Key(der)) => {
                RsaKeyPair::from_pkcs8(der.secret_pkcs8_der())
                    .map_err(|_| ToolError::Auth("invalid PKCS#8 RSA private key".into()))
            }
            Some(rustls_pemfile::Item::Pkcs1Key(der)) => {
                RsaKeyPair::from_der(der.secret_pkcs1_der())
                    .map_err(|_| ToolError::Auth("invalid PKCS#1 RSA private key".into()))
            }
            _ => Err(ToolError::Auth("missing private key".into())),
        }
    }
}

fn file_error(path: &str, err: &dyn std::fmt::Display) -> ToolError {
    ToolError::Credentials(format!(
        "Unable to read the JSON Service Account from file '{path}'.\n{err}"
    ))
}

#[derive(Serialize)]
struct JwtHeader {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: u64,
    iat: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Access token together with its expiry.
#[derive(Debug, Clone)]
pub struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Supplies bearer tokens for API requests.
#[derive(Debug)]
pub enum TokenSource {
    /// Mints tokens from a service account key, reusing them until shortly
    /// before they expire.
    ServiceAccount {
        key: ServiceAccountKey,
        cached: Mutex<Option<CachedToken>>,
    },
    /// Uses an end-user access token as is.
    AccessToken(String),
}

impl TokenSource {
    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        Ok(match credentials.kind {
            CredentialKind::ServiceAccount => TokenSource::ServiceAccount {
                key: ServiceAccountKey::from_secret(&credentials.secret)?,
                cached: Mutex::new(None),
            },
            CredentialKind::PersonalAccount => {
                TokenSource::AccessToken(credentials.secret.clone())
            }
        })
    }

    /// Account email interpolated in permission errors.
    pub fn email(&self) -> &str {
        match self {
            TokenSource::ServiceAccount { key, .. } => key.email(),
            TokenSource::AccessToken(_) => MISSING_EMAIL,
        }
    }

    /// Returns a valid bearer token, fetching a new one when needed.
    pub fn token(&self, client: &reqwest::blocking::Client) -> Result<String> {
        match self {
            TokenSource::AccessToken(token) => Ok(token.clone()),
            TokenSource::ServiceAccount { key, cached } => {
                let mut cached = cached
                    .lock()
                    .map_err(|_| ToolError::Auth("token cache poisoned".into()))?;
                let now = Utc::now();
                if let Some(token) = cached.as_ref() {
                    if token.expires_at - Duration::seconds(60) > now {
                        return Ok(token.value.clone());
                    }
                }
                let token = fetch_token(client, key, now)?;
                let value = token.value.clone();
                *cached = Some(token);
                Ok(value)
            }
        }
    }
}

fn fetch_token(
    client: &reqwest::blocking::Client,
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<CachedToken> {
    let assertion = key.signed_assertion(now)?;
    let params = [
        ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
        ("assertion", assertion.as_str()),
    ];
    let response = client.post(key.token_uri()).form(&params).send()?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        return Err(ToolError::Auth(format!(
            "token endpoint answered {status}: {body}"
        )));
    }
    let token: TokenResponse = response.json()?;
    debug!(email = key.email(), expires_in = token.expires_in, "fetched access token");
    Ok(CachedToken {
        value: token.access_token,
        expires_at: now + Duration::seconds(token.expires_in),
    })
}
