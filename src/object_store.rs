//! S3-compatible object storage client.
//!
//! Stores uploaded document bytes in an S3 bucket using the S3 REST API
//! with AWS Signature V4 authentication. Supports custom endpoints for
//! S3-compatible services (MinIO, LocalStack).
//!
//! Uses only pure-Rust dependencies (`hmac`, `sha2`) for AWS signing — no
//! C library dependencies, making it compatible with all build environments.
//!
//! # Environment Variables
//!
//! Credentials are read from environment variables:
//! - `AWS_ACCESS_KEY_ID` — required
//! - `AWS_SECRET_ACCESS_KEY` — required
//! - `AWS_SESSION_TOKEN` — optional (for temporary credentials / IAM roles)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use dossier_core::storage::ObjectStorage;

use crate::config::StorageConfig;

type HmacSha256 = Hmac<Sha256>;

/// AWS credentials loaded from environment variables.
struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .context("AWS_ACCESS_KEY_ID environment variable not set")?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// S3-backed [`ObjectStorage`] implementation.
pub struct S3Store {
    config: StorageConfig,
    client: reqwest::Client,
}

impl S3Store {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Issue a signed request for `key` and return the response.
    async fn signed_request(
        &self,
        method: &str,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<reqwest::Response> {
        let creds = AwsCredentials::from_env()?;
        let host = s3_host(&self.config);
        let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        let url = format!("https://{}/{}", host, encoded_key);

        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let payload_hash = hex_sha256(&body);

        let mut headers = vec![
            ("host".to_string(), host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ct) = content_type {
            headers.push(("content-type".to_string(), ct.to_string()));
        }
        if let Some(ref token) = creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let canonical_uri = format!("/{}", encoded_key);
        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method, canonical_uri, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &creds.secret_access_key,
            &date_stamp,
            &self.config.region,
            "s3",
        );
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            creds.access_key_id, credential_scope, signed_headers, signature
        );

        let mut req = match method {
            "PUT" => self.client.put(&url).body(body),
            "GET" => self.client.get(&url),
            "DELETE" => self.client.delete(&url),
            other => bail!("Unsupported storage method: {}", other),
        };

        req = req
            .header("Authorization", &authorization)
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-date", &amz_date);
        if let Some(ct) = content_type {
            req = req.header("Content-Type", ct);
        }
        if let Some(ref token) = creds.session_token {
            req = req.header("x-amz-security-token", token);
        }

        req.send().await.map_err(|e| {
            anyhow::anyhow!(
                "Storage request failed for s3://{}/{}: {}",
                self.config.bucket,
                key,
                e
            )
        })
    }

    /// Browsable URL for a stored key (virtual-hosted style).
    pub fn public_url(&self, key: &str) -> String {
        let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        format!("https://{}/{}", s3_host(&self.config), encoded_key)
    }
}

#[async_trait]
impl ObjectStorage for S3Store {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let resp = self
            .signed_request("PUT", path, bytes.to_vec(), Some(content_type))
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "S3 PutObject failed (HTTP {}) for key '{}': {}",
                status,
                path,
                body.chars().take(500).collect::<String>()
            );
        }

        Ok(self.public_url(path))
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self.signed_request("GET", path, Vec::new(), None).await?;

        if !resp.status().is_success() {
            let status = resp.status();
            bail!("S3 GetObject failed (HTTP {}) for key '{}'", status, path);
        }

        Ok(resp.bytes().await?.to_vec())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let resp = self
            .signed_request("DELETE", path, Vec::new(), None)
            .await?;

        // S3 returns 204 for deletes, including of already-absent keys.
        if !resp.status().is_success() {
            let status = resp.status();
            bail!(
                "S3 DeleteObject failed (HTTP {}) for key '{}'",
                status,
                path
            );
        }

        Ok(())
    }
}

// ============ AWS SigV4 Helpers ============

/// Compute the S3 hostname for the configured bucket and region.
///
/// If a custom `endpoint_url` is set (for MinIO, LocalStack, etc.),
/// that is used instead of the standard `<bucket>.s3.<region>.amazonaws.com`.
fn s3_host(config: &StorageConfig) -> String {
    if let Some(ref endpoint) = config.endpoint_url {
        endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string()
    } else {
        format!("{}.s3.{}.amazonaws.com", config.bucket, config.region)
    }
}

/// Compute the hex-encoded SHA-256 hash of data.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256 of data with the given key.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compute hex-encoded HMAC-SHA256.
fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986 (used in SigV4 canonical requests).
///
/// Encodes all characters except unreserved characters:
/// `A-Z a-z 0-9 - _ . ~`
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_encode_passes_unreserved() {
        assert_eq!(uri_encode("abc-123_x.y~z"), "abc-123_x.y~z");
    }

    #[test]
    fn test_uri_encode_escapes_reserved() {
        assert_eq!(uri_encode("a b+c"), "a%20b%2Bc");
    }

    #[test]
    fn test_s3_host_custom_endpoint() {
        let config = StorageConfig {
            bucket: "docs".to_string(),
            region: "us-east-1".to_string(),
            prefix: "documents".to_string(),
            endpoint_url: Some("http://localhost:9000/".to_string()),
        };
        assert_eq!(s3_host(&config), "localhost:9000");
    }

    #[test]
    fn test_s3_host_default() {
        let config = StorageConfig {
            bucket: "docs".to_string(),
            region: "eu-west-2".to_string(),
            prefix: "documents".to_string(),
            endpoint_url: None,
        };
        assert_eq!(s3_host(&config), "docs.s3.eu-west-2.amazonaws.com");
    }
}
