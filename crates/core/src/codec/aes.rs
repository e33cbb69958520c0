//! AES-CBC decryption for /AESV2 crypt filters.
//!
//! Encrypted payloads carry a 16-byte IV prefix; the remainder is
//! ciphertext padded with PKCS#7.

use aes::cipher::{BlockDecryptMut, KeyIvInit};
use cbc::Decryptor;

type Aes128CbcDec = Decryptor<aes::Aes128>;
type Aes256CbcDec = Decryptor<aes::Aes256>;

/// Decrypt AES-CBC data with a 16-byte (AES-128) or 32-byte (AES-256)
/// key. Returns None when the key or data shape is wrong instead of
/// panicking; a single bad object must not take the document down.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    if iv.len() != 16 || data.len() % 16 != 0 {
        return None;
    }
    let mut buf = data.to_vec();
    match key.len() {
        16 => {
            let cipher = Aes128CbcDec::new(key.into(), iv.into());
            cipher
                .decrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buf)
                .ok()?;
        }
        32 => {
            let cipher = Aes256CbcDec::new(key.into(), iv.into());
            cipher
                .decrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buf)
                .ok()?;
        }
        _ => return None,
    }
    Some(buf)
}

/// Decrypt a payload whose first 16 bytes are the IV, then strip
/// PKCS#7 padding.
pub fn aes_decrypt_with_iv(key: &[u8], payload: &[u8]) -> Option<Vec<u8>> {
    if payload.len() < 16 {
        return None;
    }
    let (iv, ciphertext) = payload.split_at(16);
    let plain = aes_cbc_decrypt(key, iv, ciphertext)?;
    Some(unpad_pkcs7(&plain).to_vec())
}

/// Remove PKCS#7 padding. Invalid padding leaves the data untouched.
fn unpad_pkcs7(data: &[u8]) -> &[u8] {
    if data.is_empty() {
        return data;
    }
    let pad_len = data[data.len() - 1] as usize;
    if pad_len == 0 || pad_len > 16 || pad_len > data.len() {
        return data;
    }
    let start = data.len() - pad_len;
    if data[start..].iter().any(|&b| b as usize != pad_len) {
        return data;
    }
    &data[..start]
}
