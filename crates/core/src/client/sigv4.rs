//! AWS Signature Version 4 request signing.
//!
//! Implements the canonical request, string-to-sign and derived-key scheme
//! from the AWS documentation. Selling Partner API requests are signed for
//! the `execute-api` service; the STS AssumeRole call reuses the same code
//! with the `sts` service name.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Url};
use sha2::{Digest, Sha256};

use super::ApiError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const LONG_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const SHORT_DATE_FORMAT: &str = "%Y%m%d";

/// Credentials used to sign a request.
///
/// `session_token` is set when signing with temporary credentials from STS;
/// it is attached as `x-amz-security-token` and covered by the signature.
#[derive(Debug, Clone)]
pub struct SigningCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// Signs `request` in place, setting the `x-amz-date`, optional
/// `x-amz-security-token` and `authorization` headers.
///
/// The signed header set covers `host` and `x-amz-date`, plus the security
/// token and the `x-amz-access-token` header when present. The query string
/// must already be RFC 3986 encoded; canonicalization sorts the pairs but
/// never re-encodes them, so the signature matches the bytes on the wire.
pub fn sign(
    request: &mut Request,
    credentials: &SigningCredentials,
    region: &str,
    service: &str,
    at: DateTime<Utc>,
) -> Result<(), ApiError> {
    let amz_date = at.format(LONG_DATE_FORMAT).to_string();
    let short_date = at.format(SHORT_DATE_FORMAT).to_string();

    insert_header(request, "x-amz-date", &amz_date)?;
    if let Some(token) = &credentials.session_token {
        insert_header(request, "x-amz-security-token", token)?;
    }

    let mut headers = BTreeMap::new();
    headers.insert("host".to_string(), canonical_host(request.url()));
    headers.insert("x-amz-date".to_string(), amz_date.clone());
    if let Some(token) = &credentials.session_token {
        headers.insert("x-amz-security-token".to_string(), token.clone());
    }
    if let Some(value) = request.headers().get("x-amz-access-token") {
        let token = value
            .to_str()
            .map_err(|e| ApiError::Auth(format!("Invalid access token header: {}", e)))?;
        headers.insert("x-amz-access-token".to_string(), token.to_string());
    }

    let payload = request
        .body()
        .and_then(|body| body.as_bytes())
        .unwrap_or_default();
    let canonical = canonical_request(
        request.method().as_str(),
        request.url().path(),
        request.url().query().unwrap_or(""),
        &headers,
        &hex::encode(Sha256::digest(payload)),
    );

    let scope = format!("{}/{}/{}/aws4_request", short_date, region, service);
    let to_sign = string_to_sign(&amz_date, &scope, &canonical);
    let key = derive_signing_key(&credentials.secret_access_key, &short_date, region, service)?;
    let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes())?);

    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");
    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.access_key_id, scope, signed_headers, signature
    );
    let value = HeaderValue::from_str(&authorization)
        .map_err(|e| ApiError::Auth(format!("Invalid authorization header: {}", e)))?;
    request.headers_mut().insert(AUTHORIZATION, value);

    Ok(())
}

fn insert_header(request: &mut Request, name: &'static str, value: &str) -> Result<(), ApiError> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| ApiError::Auth(format!("Invalid {} header: {}", name, e)))?;
    request.headers_mut().insert(name, value);
    Ok(())
}

fn canonical_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    // url reports the port only when it differs from the scheme default,
    // which matches what the HTTP client puts in the Host header.
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn canonical_query(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }
    let mut pairs: Vec<(&str, &str)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn canonical_request(
    method: &str,
    path: &str,
    query: &str,
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");
    let path = if path.is_empty() { "/" } else { path };
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        path,
        canonical_query(query),
        canonical_headers,
        signed_headers,
        payload_hash
    )
}

fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    )
}

fn derive_signing_key(
    secret: &str,
    short_date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, ApiError> {
    let secret_key = format!("AWS4{}", secret);
    let date_key = hmac_sha256(secret_key.as_bytes(), short_date.as_bytes())?;
    let region_key = hmac_sha256(&date_key, region.as_bytes())?;
    let service_key = hmac_sha256(&region_key, service.as_bytes())?;
    hmac_sha256(&service_key, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ApiError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ApiError::Auth(format!("HMAC key error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::Method;

    // Reference values from the AWS SigV4 documentation and test suite.
    const EXAMPLE_ACCESS_KEY: &str = "AKIDEXAMPLE";
    const EXAMPLE_SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    #[test]
    fn test_signing_key_derivation_matches_aws_reference() {
        let key = derive_signing_key(EXAMPLE_SECRET_KEY, "20120215", "us-east-1", "iam")
            .expect("key derivation failed");
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_sign_matches_get_vanilla_test_suite_vector() {
        let url = Url::parse("https://example.amazonaws.com/").expect("bad url");
        let mut request = Request::new(Method::GET, url);
        let credentials = SigningCredentials {
            access_key_id: EXAMPLE_ACCESS_KEY.to_string(),
            secret_access_key: EXAMPLE_SECRET_KEY.to_string(),
            session_token: None,
        };
        let at = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();

        sign(&mut request, &credentials, "us-east-1", "service", at).expect("signing failed");

        assert_eq!(
            request.headers().get("x-amz-date").unwrap(),
            "20150830T123600Z"
        );
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
    }

    #[test]
    fn test_session_token_is_attached_and_signed() {
        let url = Url::parse("https://sellingpartnerapi-eu.amazon.com/x").expect("bad url");
        let mut request = Request::new(Method::GET, url);
        let credentials = SigningCredentials {
            access_key_id: "ASIAEXAMPLE".to_string(),
            secret_access_key: EXAMPLE_SECRET_KEY.to_string(),
            session_token: Some("session-token".to_string()),
        };

        sign(
            &mut request,
            &credentials,
            "eu-west-1",
            "execute-api",
            Utc::now(),
        )
        .expect("signing failed");

        assert_eq!(
            request.headers().get("x-amz-security-token").unwrap(),
            "session-token"
        );
        let authorization = request
            .headers()
            .get(AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(authorization.contains("SignedHeaders=host;x-amz-date;x-amz-security-token"));
    }

    #[test]
    fn test_access_token_header_joins_signed_set() {
        let url = Url::parse("https://sellingpartnerapi-eu.amazon.com/x").expect("bad url");
        let mut request = Request::new(Method::GET, url);
        request
            .headers_mut()
            .insert("x-amz-access-token", HeaderValue::from_static("lwa-token"));
        let credentials = SigningCredentials {
            access_key_id: "ASIAEXAMPLE".to_string(),
            secret_access_key: EXAMPLE_SECRET_KEY.to_string(),
            session_token: None,
        };

        sign(
            &mut request,
            &credentials,
            "eu-west-1",
            "execute-api",
            Utc::now(),
        )
        .expect("signing failed");

        let authorization = request
            .headers()
            .get(AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(authorization.contains("SignedHeaders=host;x-amz-access-token;x-amz-date"));
    }

    #[test]
    fn test_canonical_query_sorts_without_reencoding() {
        assert_eq!(
            canonical_query("b=2&a=2025-01-01T00%3A00%3A00Z&a=0"),
            "a=0&a=2025-01-01T00%3A00%3A00Z&b=2"
        );
        assert_eq!(canonical_query(""), "");
        assert_eq!(canonical_query("flag"), "flag=");
    }

    #[test]
    fn test_canonical_host_keeps_explicit_port() {
        let url = Url::parse("http://127.0.0.1:8080/path").expect("bad url");
        assert_eq!(canonical_host(&url), "127.0.0.1:8080");
        let url = Url::parse("https://sts.eu-west-1.amazonaws.com/").expect("bad url");
        assert_eq!(canonical_host(&url), "sts.eu-west-1.amazonaws.com");
    }

    #[test]
    fn test_canonical_request_hashes_empty_payload() {
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "example.amazonaws.com".to_string());
        headers.insert("x-amz-date".to_string(), "20150830T123600Z".to_string());
        let canonical = canonical_request(
            "GET",
            "/",
            "",
            &headers,
            &hex::encode(Sha256::digest(b"")),
        );
        assert_eq!(
            canonical,
            "GET\n/\n\nhost:example.amazonaws.com\nx-amz-date:20150830T123600Z\n\n\
             host;x-amz-date\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
