// src/services/google_oauth.rs
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// The fields we actually need from a Google service account key file.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub private_key: String,
    pub client_email: String,
    pub token_uri: String,
}

/// Claims for the service-account JWT grant.
#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,   // service account email
    scope: &'a str, // spreadsheet access
    aud: &'a str,   // token endpoint
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Sign a service-account JWT with the key file's RSA key and exchange it
/// for a Bearer token scoped to Sheets.
pub async fn fetch_access_token(service_account_json_path: &str) -> Result<String> {
    let bytes = std::fs::read(service_account_json_path)
        .with_context(|| format!("reading service account key {}", service_account_json_path))?;
    let key: ServiceAccountKey =
        serde_json::from_slice(&bytes).context("parsing service account key")?;

    let iat = Utc::now();
    let exp = iat + Duration::minutes(59); // token valid ~1 hour
    let claims = Claims {
        iss: &key.client_email,
        scope: SPREADSHEETS_SCOPE,
        aud: &key.token_uri,
        exp: exp.timestamp(),
        iat: iat.timestamp(),
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("reading RSA key from service account file")?;
    let jwt = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)?;

    let response: TokenResponse = reqwest::Client::new()
        .post(&key.token_uri)
        .form(&[
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", jwt.as_str()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(response.access_token)
}
