//! S3 REST client implementing [`ObjectStorage`]

use async_trait::async_trait;
use buildhook_api::{
    ObjectStorage,
    WebhookError,
    WebhookResult,
};
use chrono::Utc;
use dashmap::DashMap;
use reqwest::{
    Client,
    Method,
    Response,
    Url,
};
use thiserror::Error;

use crate::config::{
    normalize_region,
    S3Config,
    DEFAULT_REGION,
    GLOBAL_ENDPOINT,
    REQUEST_TIMEOUT,
};
use crate::credentials::CredentialsChain;
use crate::signing::{
    self,
    SigningRequest,
};
use crate::types::{
    ListBucketResult,
    LocationConstraint,
};

const BUCKET_REGION_HEADER: &str = "x-amz-bucket-region";

#[derive(Debug, Error)]
pub enum S3Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} failed with status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to parse S3 response: {0}")]
    Parse(#[from] quick_xml::DeError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Credential lookup failed: {0}")]
    Credentials(String),
}

impl From<S3Error> for WebhookError {
    fn from(err: S3Error) -> Self {
        WebhookError::ObjectStorage(err.to_string())
    }
}

/// Path-style S3 client. Bucket regions are cached after the first lookup.
pub struct S3ObjectStorage {
    client: Client,
    credentials: CredentialsChain,
    endpoint: Option<String>,
    regions: DashMap<String, String>,
}

impl S3ObjectStorage {
    pub fn new(config: S3Config) -> Result<Self, S3Error> {
        let client = Client::builder()
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        if config.credentials.is_none() && !config.default_chain {
            tracing::info!("No AWS credentials configured, S3 requests will be anonymous");
        }

        Ok(Self {
            client,
            credentials: CredentialsChain::new(config.credentials, config.default_chain),
            endpoint: config
                .endpoint
                .map(|e| e.trim_end_matches('/').to_string()),
            regions: DashMap::new(),
        })
    }

    pub async fn head_bucket(&self, bucket: &str) -> Result<bool, S3Error> {
        let region = self.cached_region(bucket);
        let response = self
            .send(Method::HEAD, region.as_deref(), bucket, "")
            .await?;
        self.remember_region(bucket, &response);

        let status = response.status();
        match status.as_u16() {
            404 => Ok(false),
            // moved to another region or not ours to read, but it exists
            301 | 403 => Ok(true),
            _ if status.is_success() => Ok(true),
            code => Err(S3Error::Status {
                operation: "HeadBucket",
                status: code,
                body: String::new(),
            }),
        }
    }

    pub async fn get_location(&self, bucket: &str) -> Result<String, S3Error> {
        if let Some(region) = self.cached_region(bucket) {
            return Ok(region);
        }

        let response = self.send(Method::GET, None, bucket, "location=").await?;
        let body = checked_body("GetBucketLocation", response).await?;
        let constraint: LocationConstraint = quick_xml::de::from_str(&body)?;

        let region = normalize_region(&constraint.region);
        tracing::debug!(bucket, region = %region, "Resolved bucket region");
        self.regions.insert(bucket.to_string(), region.clone());
        Ok(region)
    }

    pub async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, S3Error> {
        let region = self.get_location(bucket).await?;

        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut params = Vec::with_capacity(3);
            if let Some(token) = &token {
                params.push(("continuation-token", token.as_str()));
            }
            params.push(("list-type", "2"));
            params.push(("prefix", prefix));

            let query = encode_query(&params);
            let response = self
                .send(Method::GET, Some(&region), bucket, &query)
                .await?;
            let body = checked_body("ListObjectsV2", response).await?;
            let page: ListBucketResult = quick_xml::de::from_str(&body)?;

            keys.extend(page.contents.into_iter().map(|object| object.key));

            match page.next_continuation_token {
                Some(next) if page.is_truncated => token = Some(next),
                _ => break,
            }
        }

        tracing::debug!(bucket, prefix, count = keys.len(), "Listed objects");
        Ok(keys)
    }

    fn cached_region(&self, bucket: &str) -> Option<String> {
        self.regions.get(bucket).map(|r| r.value().clone())
    }

    fn remember_region(&self, bucket: &str, response: &Response) {
        if let Some(region) = response
            .headers()
            .get(BUCKET_REGION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.regions.insert(bucket.to_string(), region.to_string());
        }
    }

    fn endpoint_for(&self, region: Option<&str>) -> String {
        if let Some(endpoint) = &self.endpoint {
            return endpoint.clone();
        }
        match region {
            Some(region) if region != DEFAULT_REGION => {
                format!("https://s3.{}.amazonaws.com", region)
            }
            _ => GLOBAL_ENDPOINT.to_string(),
        }
    }

    async fn send(
        &self, method: Method, region: Option<&str>, bucket: &str, query: &str,
    ) -> Result<Response, S3Error> {
        let mut url = format!(
            "{}/{}",
            self.endpoint_for(region),
            urlencoding::encode(bucket)
        );
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }
        let url = Url::parse(&url).map_err(|e| S3Error::InvalidUrl(e.to_string()))?;

        let mut builder = self.client.request(method.clone(), url.clone());

        if let Some(credentials) = self.credentials.resolve(&self.client).await {
            let host = match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{}:{}", host, port),
                (Some(host), None) => host.to_string(),
                _ => return Err(S3Error::InvalidUrl(url.to_string())),
            };
            let request = SigningRequest {
                method: method.as_str(),
                host: &host,
                path: url.path(),
                query,
                region: region.unwrap_or(DEFAULT_REGION),
            };
            for (name, value) in signing::sign(&request, &credentials, Utc::now())? {
                builder = builder.header(name, value);
            }
        }

        Ok(builder.send().await?)
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn bucket_exists(&self, bucket: &str) -> WebhookResult<bool> {
        Ok(self.head_bucket(bucket).await?)
    }

    async fn bucket_region(&self, bucket: &str) -> WebhookResult<String> {
        Ok(self.get_location(bucket).await?)
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> WebhookResult<Vec<String>> {
        Ok(self.list_keys(bucket, prefix).await?)
    }
}

pub(crate) async fn checked_body(
    operation: &'static str, response: Response,
) -> Result<String, S3Error> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(S3Error::Status {
            operation,
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Params must already be sorted by name
fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
