//! HMAC helpers shared by the provider adapters
//!
//! Providers send lowercase hex digests. Verification decodes the hex and
//! compares with `verify_slice` (constant time).

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

// HMAC 接受任意长度的 key, new_from_slice 实际不会失败
fn sha256_mac(key: &str, data: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).ok()?;
    mac.update(data.as_bytes());
    Some(mac)
}

fn sha512_mac(key: &str, data: &str) -> Option<HmacSha512> {
    let mut mac = HmacSha512::new_from_slice(key.as_bytes()).ok()?;
    mac.update(data.as_bytes());
    Some(mac)
}

pub fn hmac_sha256_hex(key: &str, data: &str) -> String {
    sha256_mac(key, data)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

pub fn hmac_sha512_hex(key: &str, data: &str) -> String {
    sha512_mac(key, data)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

pub fn verify_hmac_sha256_hex(key: &str, data: &str, signature: &str) -> bool {
    match (hex::decode(signature.trim()), sha256_mac(key, data)) {
        (Ok(bytes), Some(mac)) => mac.verify_slice(&bytes).is_ok(),
        _ => false,
    }
}

pub fn verify_hmac_sha512_hex(key: &str, data: &str, signature: &str) -> bool {
    match (hex::decode(signature.trim()), sha512_mac(key, data)) {
        (Ok(bytes), Some(mac)) => mac.verify_slice(&bytes).is_ok(),
        _ => false,
    }
}
