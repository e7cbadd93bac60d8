//! OAuth 1.0a request signing (RFC 5849, HMAC-SHA1).
//!
//! The micro-blog API authenticates every call with a signed
//! `Authorization` header. The signature covers the HTTP method, the
//! bare request URL, and every query/body parameter, all
//! percent-encoded with the RFC 3986 unreserved set and sorted
//! bytewise. Everything here is deterministic given a nonce and a
//! timestamp, which keeps it testable against published vectors.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::vault::MicroblogKeys;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

const UPPERHEX: &[u8; 16] = b"0123456789ABCDEF";

/// Percent-encodes `input` with the RFC 3986 unreserved set.
///
/// Unlike form encoding, space becomes `%20` and `~` stays bare. Hex
/// digits are uppercase, as the signature algorithm requires.
pub(crate) fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(byte));
            },
            other => {
                out.push('%');
                out.push(char::from(UPPERHEX[usize::from(other >> 4)]));
                out.push(char::from(UPPERHEX[usize::from(other & 0x0f)]));
            },
        }
    }
    out
}

/// Joins encoded `key=value` pairs with `&`, sorted bytewise by encoded
/// key, then encoded value.
fn parameter_string(params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (percent_encode(key), percent_encode(value)))
        .collect();
    pairs.sort();
    let encoded: Vec<String> = pairs.iter().map(|(key, value)| format!("{key}={value}")).collect();
    encoded.join("&")
}

/// Builds the signature base string for one request.
///
/// `params` must carry the `oauth_*` protocol parameters and every
/// query or body parameter the server will see.
pub(crate) fn signature_base(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&parameter_string(params))
    )
}

/// Signs a base string, returning the base64 HMAC-SHA1 tag.
pub(crate) fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{}&{}", percent_encode(consumer_secret), percent_encode(token_secret));
    #[allow(clippy::expect_used)]
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
        .expect("invariant: HMAC-SHA1 accepts keys of any length");
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Produces the full `Authorization` header value for one request.
///
/// `request_params` are the query/body parameters of the call. They
/// participate in the signature but are not repeated in the header.
pub(crate) fn authorization_header(
    keys: &MicroblogKeys,
    method: &str,
    url: &str,
    request_params: &[(&str, &str)],
    nonce: &str,
    timestamp: u64,
) -> String {
    let timestamp = timestamp.to_string();
    let oauth_params = [
        ("oauth_consumer_key", keys.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", keys.access_token.as_str()),
        ("oauth_version", OAUTH_VERSION),
    ];

    let mut signed: Vec<(&str, &str)> =
        Vec::with_capacity(oauth_params.len() + request_params.len());
    signed.extend_from_slice(&oauth_params);
    signed.extend_from_slice(request_params);
    let base = signature_base(method, url, &signed);
    let tag = sign(&base, &keys.consumer_secret, &keys.access_token_secret);

    let mut header_params: Vec<(&str, String)> = oauth_params
        .iter()
        .map(|(key, value)| (*key, percent_encode(value)))
        .collect();
    header_params.push(("oauth_signature", percent_encode(&tag)));
    header_params.sort();
    let rendered: Vec<String> = header_params
        .iter()
        .map(|(key, value)| format!("{key}=\"{value}\""))
        .collect();
    format!("OAuth {}", rendered.join(", "))
}

/// Generates a fresh random nonce, 32 hex characters.
pub(crate) fn fresh_nonce() -> String {
    let mut bytes = [0u8; 16];
    #[allow(clippy::expect_used)]
    getrandom::fill(&mut bytes).expect("invariant: operating system RNG must be available");
    hex::encode(bytes)
}
