//! OAuth 1.0a request signing (HMAC-SHA1) for the Twitter v1.1 API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;

use bnes_core::config::TwitterApiConfig;

// RFC 3986 unreserved characters stay as they are, everything else is escaped.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Build the `Authorization` header for a request.
///
/// `params` are the query or form parameters of the request; JSON bodies are not signed.
pub(crate) fn authorization_header(
    keys: &TwitterApiConfig,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    nonce: &str,
    timestamp: i64,
) -> String {
    let timestamp = timestamp.to_string();
    let oauth_params = [
        ("oauth_consumer_key", keys.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", keys.access_key.as_str()),
        ("oauth_version", "1.0"),
    ];

    let signature = signature(
        keys,
        method,
        url,
        oauth_params.iter().chain(params.iter()).copied(),
    );

    let fields = oauth_params
        .iter()
        .copied()
        .chain([("oauth_signature", signature.as_str())])
        .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {fields}")
}

fn signature<'a>(
    keys: &TwitterApiConfig,
    method: &str,
    url: &str,
    params: impl Iterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut encoded = params
        .map(|(key, value)| (encode(key), encode(value)))
        .collect::<Vec<_>>();
    encoded.sort();

    let parameter_string = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&parameter_string)
    );
    let signing_key = format!(
        "{}&{}",
        encode(&keys.consumer_secret),
        encode(&keys.access_secret)
    );

    let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(base_string.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, UNRESERVED).to_string()
}
