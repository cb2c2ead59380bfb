//! S3 artifact listing for Buildhook
//!
//! Lists artifacts uploaded to an S3 bucket for a build, so that webhook
//! payloads can link to them next to the locally archived files.
//!
//! # Architecture
//!
//! - `client` - REST client implementing `ObjectStorage`
//! - `signing` - AWS Signature Version 4
//! - `types` - XML response types
//! - `config` - credentials and region helpers
//! - `credentials` - default AWS credential chain

mod client;
mod config;
mod credentials;
mod signing;
mod types;

pub use client::{
    S3Error,
    S3ObjectStorage,
};
pub use config::{
    normalize_region,
    Credentials,
    S3Config,
};
