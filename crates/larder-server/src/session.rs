use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use larder_model::Role;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
const SESSION_VERSION_V1: &str = "v1";
const MAX_SESSION_TOKEN_LEN: usize = 512;
const MAX_SESSION_PAYLOAD_PART_LEN: usize = 384;
const MAX_SESSION_SIG_PART_LEN: usize = 128;

pub(crate) const SESSION_COOKIE_NAME: &str = "larder_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub(crate) enum SessionErrorCode {
    InvalidFormat,
    UnsupportedVersion,
    InvalidSignature,
    InvalidPayload,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionError {
    pub code: SessionErrorCode,
    pub message: String,
}

impl SessionError {
    #[must_use]
    pub fn new(code: SessionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for SessionError {}

/// Signed claims carried by the session cookie. The server keeps no
/// session table; the cookie is the whole session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct SessionPayload {
    #[serde(default = "session_version_v1")]
    pub session_version: String,
    pub role: Role,
    pub issued_at: u64,
    pub expires_at: u64,
}

pub(crate) fn encode_session(payload: &SessionPayload, secret: &[u8]) -> Result<String, SessionError> {
    let payload_bytes = serde_json::to_vec(payload)
        .map_err(|e| SessionError::new(SessionErrorCode::InvalidPayload, e.to_string()))?;
    let payload_part = URL_SAFE_NO_PAD.encode(payload_bytes);
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| SessionError::new(SessionErrorCode::InvalidPayload, e.to_string()))?;
    mac.update(payload_part.as_bytes());
    let sig = mac.finalize().into_bytes();
    let sig_part = URL_SAFE_NO_PAD.encode(sig);
    Ok(format!(
        "{}.{}.{}",
        SESSION_VERSION_V1, payload_part, sig_part
    ))
}

pub(crate) fn decode_session(
    token: &str,
    secret: &[u8],
    now_unix: u64,
) -> Result<SessionPayload, SessionError> {
    if token.len() > MAX_SESSION_TOKEN_LEN {
        return Err(SessionError::new(
            SessionErrorCode::InvalidFormat,
            "session token exceeds max length",
        ));
    }
    let (payload_part, sig_part) = parse_session_parts(token)?;
    if payload_part.len() > MAX_SESSION_PAYLOAD_PART_LEN || sig_part.len() > MAX_SESSION_SIG_PART_LEN
    {
        return Err(SessionError::new(
            SessionErrorCode::InvalidFormat,
            "session token part exceeds max length",
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| SessionError::new(SessionErrorCode::InvalidPayload, e.to_string()))?;
    mac.update(payload_part.as_bytes());
    let expected = URL_SAFE_NO_PAD
        .decode(sig_part)
        .map_err(|e| SessionError::new(SessionErrorCode::InvalidFormat, e.to_string()))?;
    mac.verify_slice(&expected).map_err(|_| {
        SessionError::new(
            SessionErrorCode::InvalidSignature,
            "session signature mismatch",
        )
    })?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_part)
        .map_err(|e| SessionError::new(SessionErrorCode::InvalidFormat, e.to_string()))?;
    let payload: SessionPayload = serde_json::from_slice(&payload_bytes)
        .map_err(|e| SessionError::new(SessionErrorCode::InvalidPayload, e.to_string()))?;

    if payload.session_version != SESSION_VERSION_V1 {
        return Err(SessionError::new(
            SessionErrorCode::UnsupportedVersion,
            "session version unsupported",
        ));
    }
    if payload.expires_at <= now_unix {
        return Err(SessionError::new(
            SessionErrorCode::Expired,
            "session expired",
        ));
    }
    Ok(payload)
}

fn parse_session_parts(token: &str) -> Result<(&str, &str), SessionError> {
    let parts: Vec<&str> = token.split('.').collect();
    match parts.as_slice() {
        [version, payload, sig] if *version == SESSION_VERSION_V1 => Ok((payload, sig)),
        [version, _, _] => Err(SessionError::new(
            SessionErrorCode::UnsupportedVersion,
            format!("unsupported session version: {version}"),
        )),
        _ => Err(SessionError::new(
            SessionErrorCode::InvalidFormat,
            "invalid session token format",
        )),
    }
}

fn session_version_v1() -> String {
    SESSION_VERSION_V1.to_string()
}

pub(crate) fn unix_now_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

pub(crate) fn session_cookie_value(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get("cookie")?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE_NAME).then_some(value)
    })
}

/// Resolves the caller's role from the session cookie; absent, tampered,
/// or expired cookies all read as anonymous.
pub(crate) fn role_from_headers(headers: &HeaderMap, secret: &[u8], now_unix: u64) -> Option<Role> {
    let token = session_cookie_value(headers)?;
    decode_session(token, secret, now_unix)
        .ok()
        .map(|payload| payload.role)
}

pub(crate) fn issue_session_cookie(
    role: Role,
    secret: &[u8],
    now_unix: u64,
    ttl_secs: u64,
) -> Result<String, SessionError> {
    let payload = SessionPayload {
        session_version: SESSION_VERSION_V1.to_string(),
        role,
        issued_at: now_unix,
        expires_at: now_unix.saturating_add(ttl_secs),
    };
    let token = encode_session(&payload, secret)?;
    Ok(format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_secs}"
    ))
}

pub(crate) fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"test-session-secret";

    fn payload(role: Role, now: u64, ttl: u64) -> SessionPayload {
        SessionPayload {
            session_version: SESSION_VERSION_V1.to_string(),
            role,
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    #[test]
    fn session_round_trip_preserves_role_and_expiry() {
        let token = encode_session(&payload(Role::Admin, 1_000, 60), SECRET).expect("encode");
        let decoded = decode_session(&token, SECRET, 1_030).expect("decode");
        assert_eq!(decoded.role, Role::Admin);
        assert_eq!(decoded.expires_at, 1_060);
    }

    #[test]
    fn expired_sessions_are_rejected() {
        let token = encode_session(&payload(Role::User, 1_000, 60), SECRET).expect("encode");
        let err = decode_session(&token, SECRET, 1_060).expect_err("expired");
        assert_eq!(err.code, SessionErrorCode::Expired);
    }

    #[test]
    fn tampered_payloads_fail_signature_verification() {
        let token = encode_session(&payload(Role::User, 1_000, 60), SECRET).expect("encode");
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&payload(Role::Admin, 1_000, 60)).expect("json"),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        let err = decode_session(&forged, SECRET, 1_030).expect_err("forged");
        assert_eq!(err.code, SessionErrorCode::InvalidSignature);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = encode_session(&payload(Role::Admin, 1_000, 60), b"other").expect("encode");
        let err = decode_session(&token, SECRET, 1_030).expect_err("wrong secret");
        assert_eq!(err.code, SessionErrorCode::InvalidSignature);
    }

    #[test]
    fn malformed_tokens_report_format_errors() {
        let err = decode_session("no-dots-here", SECRET, 0).expect_err("format");
        assert_eq!(err.code, SessionErrorCode::InvalidFormat);
        let err = decode_session("v9.abc.def", SECRET, 0).expect_err("version");
        assert_eq!(err.code, SessionErrorCode::UnsupportedVersion);
        let oversized = format!("v1.{}.sig", "a".repeat(600));
        let err = decode_session(&oversized, SECRET, 0).expect_err("length");
        assert_eq!(err.code, SessionErrorCode::InvalidFormat);
    }

    #[test]
    fn cookie_header_parsing_finds_the_session_among_others() {
        let token = encode_session(&payload(Role::User, 1_000, 60), SECRET).expect("encode");
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE_NAME}={token}; lang=en"))
                .expect("header"),
        );
        assert_eq!(
            role_from_headers(&headers, SECRET, 1_030),
            Some(Role::User)
        );
        assert_eq!(role_from_headers(&headers, SECRET, 9_999), None);

        let mut bare = HeaderMap::new();
        bare.insert("cookie", HeaderValue::from_static("theme=dark"));
        assert_eq!(role_from_headers(&bare, SECRET, 1_030), None);
    }

    #[test]
    fn issued_cookies_carry_scope_and_lifetime_attributes() {
        let cookie =
            issue_session_cookie(Role::Admin, SECRET, 1_000, 3_600).expect("issue");
        assert!(cookie.starts_with("larder_session=v1."));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
