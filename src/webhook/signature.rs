// src/webhook/signature.rs
// X-Hub-Signature-256 verification

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{PoliceError, Result};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// `sha256=<hex>` signature GitHub would send for `body`
pub fn sign(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| PoliceError::Signature)?;
    mac.update(body);
    Ok(format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes())))
}

/// Check `header` (the raw X-Hub-Signature-256 value) against `body` in constant time
pub fn verify(secret: &str, body: &[u8], header: Option<&str>) -> Result<()> {
    let provided = header
        .and_then(|h| h.trim().strip_prefix(SIGNATURE_PREFIX))
        .ok_or(PoliceError::Signature)?;
    let provided = hex::decode(provided).map_err(|_| PoliceError::Signature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| PoliceError::Signature)?;
    mac.update(body);
    mac.verify_slice(&provided).map_err(|_| PoliceError::Signature)
}
