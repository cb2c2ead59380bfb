//! AWS Signature Version 4 for S3 requests

use chrono::{
    DateTime,
    Utc,
};
use hmac::{
    Hmac,
    Mac,
};
use sha2::{
    Digest,
    Sha256,
};

use crate::client::S3Error;
use crate::config::Credentials;

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 of an empty body
pub(crate) const EMPTY_PAYLOAD_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

const SERVICE: &str = "s3";

pub(crate) struct SigningRequest<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    /// Already sorted and percent-encoded
    pub query: &'a str,
    pub region: &'a str,
}

/// Headers to attach to the request, `Authorization` included
pub(crate) fn sign(
    request: &SigningRequest<'_>, credentials: &Credentials, now: DateTime<Utc>,
) -> Result<Vec<(&'static str, String)>, S3Error> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    let mut headers = vec![
        ("host", request.host.to_string()),
        ("x-amz-content-sha256", EMPTY_PAYLOAD_HASH.to_string()),
        ("x-amz-date", amz_date.clone()),
    ];
    if let Some(token) = &credentials.session_token {
        headers.push(("x-amz-security-token", token.clone()));
    }

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        request.path,
        request.query,
        canonical_headers,
        signed_headers,
        EMPTY_PAYLOAD_HASH
    );

    let scope = format!("{}/{}/{}/aws4_request", date, request.region, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = hmac_sha256(
        format!("AWS4{}", credentials.secret_key).as_bytes(),
        date.as_bytes(),
    )?;
    let key = hmac_sha256(&key, request.region.as_bytes())?;
    let key = hmac_sha256(&key, SERVICE.as_bytes())?;
    let key = hmac_sha256(&key, b"aws4_request")?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    headers.retain(|(name, _)| *name != "host");
    headers.push((
        "authorization",
        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, credentials.access_key, scope, signed_headers, signature
        ),
    ));

    Ok(headers)
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, S3Error> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| S3Error::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
