//! Time-limited signed object URLs.
//!
//! A temp URL grants GET or PUT access to one object until an expiry
//! time, authenticated by an HMAC-SHA1 over `METHOD\nexpires\npath`
//! with the account's shared signing key. The signed path starts at the
//! `/vN/` version segment of the account's management URL.

use chrono::Utc;
use hmac::{Hmac, Mac};
use regex::Regex;
use sha1::Sha1;

use crate::error::StorageError;

type HmacSha1 = Hmac<Sha1>;

/// Signs temp URLs for one storage account.
pub struct TempUrlSigner {
    base_url: String,
    account_path: String,
}

impl TempUrlSigner {
    /// Build a signer from the account's management URL.
    ///
    /// # Arguments
    /// * `management_url` - e.g. `https://storage.example.com/v1/AUTH_abc`
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the URL has no `/vN/` version segment.
    pub fn new(management_url: &str) -> Result<Self, StorageError> {
        // The pattern is a literal, so compilation cannot fail.
        let version_segment: Regex = Regex::new(r"/v\d+/").unwrap();
        let m: regex::Match = version_segment.find(management_url).ok_or_else(|| {
            StorageError::InvalidConfig {
                message: format!(
                    "management URL '{management_url}' has no version segment to sign under"
                ),
            }
        })?;

        Ok(Self {
            base_url: management_url[..m.start()].to_string(),
            account_path: management_url[m.start()..].trim_end_matches('/').to_string(),
        })
    }

    /// Produce a signed URL for one object.
    ///
    /// # Arguments
    /// * `container` - Container holding the object
    /// * `object` - Object name
    /// * `seconds` - Lifetime of the URL from now
    /// * `method` - `GET` or `PUT`
    /// * `key` - The account's temp URL signing key
    ///
    /// # Errors
    /// * `InvalidMethod` for any method other than GET or PUT
    /// * `InvalidSignatureInput` if the object path is not ASCII
    pub fn sign(
        &self,
        container: &str,
        object: &str,
        seconds: u64,
        method: &str,
        key: &str,
    ) -> Result<String, StorageError> {
        let method: String = method.to_uppercase();
        if method != "GET" && method != "PUT" {
            return Err(StorageError::InvalidMethod { method });
        }

        let path: String = format!(
            "{}/{}/{}",
            self.account_path,
            container.trim_matches('/'),
            object.trim_start_matches('/')
        );
        if !path.is_ascii() {
            // The signing scheme hashes the raw path bytes, so names
            // outside ASCII produce signatures the service rejects.
            return Err(StorageError::InvalidSignatureInput {
                path,
                reason: "path must be ASCII".to_string(),
            });
        }

        let expires: i64 = Utc::now().timestamp() + seconds as i64;
        let signature: String = hmac_sha1_hex(key, &method, expires, &path);
        Ok(format!(
            "{}{}?temp_url_sig={}&temp_url_expires={}",
            self.base_url, path, signature, expires
        ))
    }
}

fn hmac_sha1_hex(key: &str, method: &str, expires: i64, path: &str) -> String {
    let body: String = format!("{method}\n{expires}\n{path}");
    // HMAC accepts keys of any length.
    let mut mac: HmacSha1 = HmacSha1::new_from_slice(key.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MGT_URL: &str = "https://storage.example.com/v1/AUTH_abc123";

    #[test]
    fn test_new_requires_version_segment() {
        assert!(TempUrlSigner::new("https://storage.example.com/nope").is_err());
        assert!(TempUrlSigner::new("https://storage.example.com/v1/AUTH_x").is_ok());
        assert!(TempUrlSigner::new("https://storage.example.com/v2/AUTH_x/").is_ok());
    }

    #[test]
    fn test_sign_rejects_invalid_method() {
        let signer: TempUrlSigner = TempUrlSigner::new(MGT_URL).unwrap();
        let result: Result<String, StorageError> =
            signer.sign("docs", "file.txt", 60, "POST", "secret");
        assert!(matches!(result, Err(StorageError::InvalidMethod { .. })));
    }

    #[test]
    fn test_sign_rejects_non_ascii_path() {
        let signer: TempUrlSigner = TempUrlSigner::new(MGT_URL).unwrap();
        let result: Result<String, StorageError> =
            signer.sign("docs", "r\u{e9}sum\u{e9}.pdf", 60, "GET", "secret");
        assert!(matches!(
            result,
            Err(StorageError::InvalidSignatureInput { .. })
        ));
    }

    #[test]
    fn test_sign_produces_well_formed_url() {
        let signer: TempUrlSigner = TempUrlSigner::new(MGT_URL).unwrap();
        let before: i64 = Utc::now().timestamp();
        let url: String = signer.sign("docs", "file.txt", 60, "get", "secret").unwrap();
        let after: i64 = Utc::now().timestamp();

        let (location, query): (&str, &str) = url.split_once('?').unwrap();
        assert_eq!(
            location,
            "https://storage.example.com/v1/AUTH_abc123/docs/file.txt"
        );

        let mut sig: Option<&str> = None;
        let mut expires: Option<i64> = None;
        for pair in query.split('&') {
            let (k, v): (&str, &str) = pair.split_once('=').unwrap();
            match k {
                "temp_url_sig" => sig = Some(v),
                "temp_url_expires" => expires = Some(v.parse().unwrap()),
                other => panic!("unexpected query parameter {other}"),
            }
        }

        let sig: &str = sig.unwrap();
        assert_eq!(sig.len(), 40);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let expires: i64 = expires.unwrap();
        assert!(expires >= before + 60 && expires <= after + 60);
    }

    #[test]
    fn test_get_and_put_signatures_differ() {
        assert_ne!(
            hmac_sha1_hex("secret", "GET", 1_700_000_000, "/v1/AUTH_x/c/o"),
            hmac_sha1_hex("secret", "PUT", 1_700_000_000, "/v1/AUTH_x/c/o")
        );
    }

    #[test]
    fn test_signature_depends_on_key_and_expiry() {
        let base: String = hmac_sha1_hex("key", "GET", 1_700_000_000, "/v1/AUTH_x/c/o");
        assert_ne!(
            base,
            hmac_sha1_hex("other", "GET", 1_700_000_000, "/v1/AUTH_x/c/o")
        );
        assert_ne!(
            base,
            hmac_sha1_hex("key", "GET", 1_700_000_060, "/v1/AUTH_x/c/o")
        );
    }
}
