// Object storage - SigV4 query-string presigning against an S3-compatible
// endpoint (R2, S3, MinIO).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};
use crate::infrastructure::traits::{ObjectStorage, PresignedUpload};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Everything needed to sign one request.
#[derive(Debug, Clone)]
pub struct PresignRequest<'a> {
    pub method: &'a str,
    pub scheme: &'a str,
    pub host: &'a str,
    /// Already-encoded absolute path.
    pub path: &'a str,
    /// Extra headers the uploader must send, lower-case names.
    pub headers: &'a [(&'a str, &'a str)],
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub region: &'a str,
    pub expires_secs: u64,
    pub now: DateTime<Utc>,
}

/// Percent-encodes per the SigV4 rules: only unreserved characters pass.
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn hmac(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn signing_key(secret: &str, date: &str, region: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{}", secret).as_bytes(), date);
    let k_region = hmac(&k_date, region);
    let k_service = hmac(&k_region, SERVICE);
    hmac(&k_service, "aws4_request")
}

/// Builds a presigned URL for `request`.
pub fn presign_url(request: &PresignRequest<'_>) -> String {
    let amz_date = request.now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = request.now.format("%Y%m%d").to_string();
    let scope = format!("{}/{}/{}/aws4_request", date, request.region, SERVICE);
    let credential = format!("{}/{}", request.access_key_id, scope);

    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    headers.push(("host".to_string(), request.host.to_string()));
    headers.sort();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect();

    let mut query = vec![
        ("X-Amz-Algorithm", ALGORITHM.to_string()),
        ("X-Amz-Credential", credential),
        ("X-Amz-Date", amz_date.clone()),
        ("X-Amz-Expires", request.expires_secs.to_string()),
        ("X-Amz-SignedHeaders", signed_headers.clone()),
    ];
    query.sort();
    let canonical_query = query
        .iter()
        .map(|(name, value)| format!("{}={}", uri_encode(name, true), uri_encode(value, true)))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        request.path,
        canonical_query,
        canonical_headers,
        signed_headers,
        UNSIGNED_PAYLOAD
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );
    let key = signing_key(request.secret_access_key, &date, request.region);
    let signature = hex::encode(hmac(&key, &string_to_sign));

    format!(
        "{}://{}{}?{}&X-Amz-Signature={}",
        request.scheme, request.host, request.path, canonical_query, signature
    )
}

/// Path-style S3-compatible storage.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: reqwest::Client,
    scheme: String,
    host: String,
    base_path: String,
    bucket: String,
    access_key_id: String,
    secret_access_key: String,
    region: String,
    public_url: String,
    expires_secs: u64,
}

impl S3Storage {
    /// Fails with `Configuration` naming the missing settings; callers must
    /// not forward that detail to clients.
    pub fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let missing = config.missing_settings();
        if !missing.is_empty() {
            return Err(AppError::Configuration(format!(
                "missing storage settings: {}",
                missing.join(", ")
            )));
        }
        let setting = |value: &Option<String>| value.clone().unwrap_or_default();

        let endpoint = Url::parse(&setting(&config.endpoint))
            .map_err(|e| AppError::Configuration(format!("invalid STORAGE_ENDPOINT: {}", e)))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(AppError::Configuration(
                    "STORAGE_ENDPOINT has no host".to_string(),
                ))
            }
        };

        Ok(Self {
            client: reqwest::Client::new(),
            scheme: endpoint.scheme().to_string(),
            host,
            base_path: endpoint.path().trim_end_matches('/').to_string(),
            bucket: setting(&config.bucket),
            access_key_id: setting(&config.access_key_id),
            secret_access_key: setting(&config.secret_access_key),
            region: config.region.clone(),
            public_url: setting(&config.public_url).trim_end_matches('/').to_string(),
            expires_secs: config.url_expiry_secs,
        })
    }

    fn object_path(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_path,
            uri_encode(&self.bucket, true),
            uri_encode(key, false)
        )
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, uri_encode(key, false))
    }

    pub fn presign_at(
        &self,
        method: &str,
        key: &str,
        headers: &[(&str, &str)],
        now: DateTime<Utc>,
    ) -> String {
        let path = self.object_path(key);
        presign_url(&PresignRequest {
            method,
            scheme: &self.scheme,
            host: &self.host,
            path: &path,
            headers,
            access_key_id: &self.access_key_id,
            secret_access_key: &self.secret_access_key,
            region: &self.region,
            expires_secs: self.expires_secs,
            now,
        })
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    #[instrument(skip(self))]
    async fn presign_upload(&self, key: &str, content_type: &str) -> AppResult<PresignedUpload> {
        let upload_url = self.presign_at("PUT", key, &[("content-type", content_type)], Utc::now());
        info!("issued upload URL for {}", key);
        Ok(PresignedUpload {
            upload_url,
            public_url: self.public_url(key),
            key: key.to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn delete_object(&self, key: &str) -> AppResult<()> {
        let url = self.presign_at("DELETE", key, &[], Utc::now());
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| AppError::Transient(format!("delete {}: {}", key, e)))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!("deleted {} ({})", key, status);
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("storage rejected credentials deleting {}: {}", key, body);
                Err(AppError::Configuration(format!(
                    "storage rejected credentials ({})",
                    status
                )))
            }
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => Err(
                AppError::Transient(format!("delete {} failed with {}", key, status)),
            ),
            _ => Err(AppError::Internal(format!(
                "delete {} failed with {}: {}",
                key, status, body
            ))),
        }
    }
}
