//! Cosmos DB master-key authorization for REST calls.
//!
//! Every request carries an `authorization` header holding an HMAC-SHA256 of
//! the verb, resource type, resource link and `x-ms-date` value, keyed with the
//! base64-decoded account key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;

use crate::client::GraphError;

/// Characters left alone when encoding the token (RFC 3986 unreserved).
const TOKEN_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A decoded account key, ready to sign requests.
#[derive(Clone)]
pub struct MasterKey {
    mac: Hmac<Sha256>,
}

impl MasterKey {
    /// Decode a base64 account key. No network I/O.
    pub fn from_base64(key: &str) -> Result<Self, GraphError> {
        let raw = STANDARD
            .decode(key.trim())
            .map_err(|e| GraphError::InvalidConfig(format!("auth key is not valid base64: {e}")))?;
        if raw.is_empty() {
            return Err(GraphError::InvalidConfig("auth key is empty".to_string()));
        }
        let mac = Hmac::<Sha256>::new_from_slice(&raw)
            .map_err(|e| GraphError::InvalidConfig(format!("auth key rejected: {e}")))?;
        Ok(Self { mac })
    }

    /// Build the URL-encoded `authorization` header value.
    ///
    /// `resource_link` is the unencoded link of the addressed resource
    /// (`dbs/graphdb/colls/Persons`), or of the parent for creates.
    pub fn authorization(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> String {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        let token = format!("type=master&ver=1.0&sig={signature}");
        utf8_percent_encode(&token, TOKEN_ENCODE_SET).to_string()
    }
}

/// Format a timestamp the way `x-ms-date` expects (RFC 1123, GMT).
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
