use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, PartialEq)]
pub enum SignatureError {
    #[error("Signing secret is not set")]
    MissingSecret,

    #[error("Signature is missing")]
    MissingSignature,

    #[error("Invalid signature encoding")]
    InvalidEncoding,

    #[error("Signature does not match")]
    Mismatch,
}

fn mac_for(secret: &str, message: &str) -> Result<HmacSha256, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }

    // HMAC accepts keys of any length, so this only fails on an empty secret, handled above
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::MissingSecret)?;
    mac.update(message.as_bytes());
    Ok(mac)
}

/// Base64url (unpadded) HMAC-SHA256 of `message`.
pub fn sign(secret: &str, message: &str) -> Result<String, SignatureError> {
    let mac = mac_for(secret, message)?;
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a signature produced by [`sign`].
pub fn verify(secret: &str, message: &str, signature: Option<&str>) -> Result<(), SignatureError> {
    let signature = signature
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::MissingSignature)?;

    let raw = URL_SAFE_NO_PAD.decode(signature).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        SignatureError::InvalidEncoding
    })?;

    mac_for(secret, message)?
        .verify_slice(&raw)
        .map_err(|_| {
            debug!("Callback signature verification failed");
            SignatureError::Mismatch
        })
}
