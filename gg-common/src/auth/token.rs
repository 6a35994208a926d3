//! Timed, signed tokens
//!
//! Format: `base64url(json claims) "." base64url(hmac-sha256)`. Every token
//! carries an `exp` claim (unix seconds) plus one claim naming its purpose,
//! whose value is the subject id. A token issued for one purpose never
//! verifies for another.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const MAX_TOKEN_LEN: usize = 2048;

/// Purpose of a token; each maps to its subject claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// API bearer-style token (`GET /token`)
    Auth,
    /// Account confirmation
    Confirm,
    /// Password reset
    Reset,
    /// Email change; carries `new_email`
    ChangeEmail,
    /// Admin view session cookie
    Session,
    /// Pre-authorized upload of one asset's content
    AssetUpload,
}

impl TokenKind {
    pub fn claim(self) -> &'static str {
        match self {
            TokenKind::Auth => "id",
            TokenKind::Confirm => "confirm",
            TokenKind::Reset => "reset",
            TokenKind::ChangeEmail => "change_email",
            TokenKind::Session => "session",
            TokenKind::AssetUpload => "upload_asset",
        }
    }
}

/// Signs and verifies tokens with the application secret key
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Issue a token for `subject` valid for `ttl_secs`
    pub fn issue(&self, kind: TokenKind, subject: i64, ttl_secs: i64) -> Result<String> {
        self.issue_with(kind, subject, Map::new(), ttl_secs)
    }

    /// Issue a token with additional claims
    pub fn issue_with(
        &self,
        kind: TokenKind,
        subject: i64,
        mut extra: Map<String, Value>,
        ttl_secs: i64,
    ) -> Result<String> {
        extra.insert(kind.claim().to_string(), Value::from(subject));
        self.sign_at(extra, chrono::Utc::now().timestamp(), ttl_secs)
    }

    /// Sign raw claims as if issued at `issued_at`
    pub fn sign_at(
        &self,
        mut claims: Map<String, Value>,
        issued_at: i64,
        ttl_secs: i64,
    ) -> Result<String> {
        claims.insert("exp".to_string(), Value::from(issued_at + ttl_secs));
        let payload = serde_json::to_vec(&Value::Object(claims))
            .map_err(|e| Error::Internal(format!("Failed to encode token claims: {}", e)))?;
        let payload_part = URL_SAFE_NO_PAD.encode(payload);
        let sig_part = URL_SAFE_NO_PAD.encode(self.mac(payload_part.as_bytes())?.finalize().into_bytes());
        Ok(format!("{}.{}", payload_part, sig_part))
    }

    /// Verify signature and expiry; returns all claims
    pub fn verify(&self, token: &str) -> Result<Map<String, Value>> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(Error::Token("token exceeds max length".to_string()));
        }
        let (payload_part, sig_part) = token
            .split_once('.')
            .ok_or_else(|| Error::Token("malformed token".to_string()))?;

        let signature = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|e| Error::Token(e.to_string()))?;
        self.mac(payload_part.as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| Error::Token("signature mismatch".to_string()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|e| Error::Token(e.to_string()))?;
        let claims: Map<String, Value> =
            serde_json::from_slice(&payload).map_err(|e| Error::Token(e.to_string()))?;

        let exp = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Token("missing expiry".to_string()))?;
        if chrono::Utc::now().timestamp() >= exp {
            return Err(Error::Token("token expired".to_string()));
        }
        Ok(claims)
    }

    /// Verify and return the subject id for `kind`
    pub fn subject(&self, token: &str, kind: TokenKind) -> Result<i64> {
        let claims = self.verify(token)?;
        claims
            .get(kind.claim())
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Token(format!("not a {:?} token", kind)))
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Internal(format!("Invalid secret key: {}", e)))?;
        mac.update(data);
        Ok(mac)
    }
}
