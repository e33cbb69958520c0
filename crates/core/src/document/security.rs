//! Standard security handler.
//!
//! Decrypts strings and streams for documents encrypted with the
//! /Standard filter, revisions 2 and 3 (RC4) and revision 4 (crypt
//! filters, RC4 or AES-128). Revisions 5 and 6 are reported as an
//! unsupported handler.

use crate::codec::aes::aes_decrypt_with_iv;
use crate::codec::arcfour::rc4;
use crate::error::{PdfError, Result};
use crate::model::{Dict, DictExt, PdfObject};

/// Password padding constant from the standard handler algorithms.
pub const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Per-object decryption, driven by the resolver.
pub trait SecurityHandler: std::fmt::Debug {
    /// Decrypt string bytes belonging to object `objnum`/`gennum`.
    fn decrypt_string(&self, objnum: u32, gennum: u32, data: &[u8]) -> Vec<u8>;

    /// Decrypt stream payload bytes. `attrs` lets the handler honor
    /// /EncryptMetadata false for metadata streams.
    fn decrypt_stream(&self, objnum: u32, gennum: u32, data: &[u8], attrs: &Dict) -> Vec<u8>;

    /// The /P permission flags.
    fn permissions(&self) -> u32;

    /// Whether the document metadata stream is encrypted too.
    fn is_metadata_encrypted(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CryptMethod {
    Identity,
    Rc4,
    Aes128,
}

/// The /Standard filter, revisions 2 through 4.
#[derive(Debug)]
pub struct StandardSecurityHandler {
    key: Vec<u8>,
    r: i64,
    length: i64,
    o: Vec<u8>,
    u: Vec<u8>,
    p: u32,
    docid: Vec<u8>,
    stream_method: CryptMethod,
    string_method: CryptMethod,
    encrypt_metadata: bool,
}

impl StandardSecurityHandler {
    /// Build a handler from the /Encrypt dictionary and the first
    /// document ID string, authenticating `password` as user then
    /// owner password. Fails with `Password` when neither matches.
    pub fn new(encrypt: &Dict, docid: &[u8], password: &[u8]) -> Result<Self> {
        let r = encrypt
            .get_int("R")
            .ok_or_else(|| PdfError::EncryptionError("missing /R".into()))?;
        let length = encrypt.get_int("Length").unwrap_or(40).clamp(40, 128);
        let o = get_string(encrypt, "O")?;
        let u = get_string(encrypt, "U")?;
        let p = encrypt
            .get_int("P")
            .ok_or_else(|| PdfError::EncryptionError("missing /P".into()))?
            as u32;

        let encrypt_metadata = match encrypt.get("EncryptMetadata") {
            Some(PdfObject::Bool(b)) => *b,
            _ => true,
        };

        let (stream_method, string_method) = match r {
            2 | 3 => (CryptMethod::Rc4, CryptMethod::Rc4),
            4 => {
                let cf = match encrypt.get("CF") {
                    Some(PdfObject::Dict(d)) => Some(d),
                    _ => None,
                };
                let stmf = encrypt.get_name("StmF").unwrap_or("Identity");
                let strf = encrypt.get_name("StrF").unwrap_or("Identity");
                (
                    resolve_crypt_method(cf, stmf)?,
                    resolve_crypt_method(cf, strf)?,
                )
            }
            _ => {
                return Err(PdfError::Handler(format!(
                    "standard security revision {r}"
                )))
            }
        };

        let mut handler = Self {
            key: Vec::new(),
            r,
            length,
            o,
            u,
            p,
            docid: docid.to_vec(),
            stream_method,
            string_method,
            encrypt_metadata,
        };

        if let Some(key) = handler.authenticate_user_password(password) {
            handler.key = key;
        } else if let Some(key) = handler.authenticate_owner_password(password) {
            handler.key = key;
        } else {
            return Err(PdfError::Password);
        }
        Ok(handler)
    }

    fn key_bytes(&self) -> usize {
        if self.r == 2 {
            5
        } else {
            (self.length / 8) as usize
        }
    }

    fn pad_password(password: &[u8]) -> [u8; 32] {
        let mut padded = [0u8; 32];
        let len = password.len().min(32);
        padded[..len].copy_from_slice(&password[..len]);
        padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
        padded
    }

    /// Algorithm 2: file encryption key from a (user) password.
    fn compute_encryption_key(&self, password: &[u8]) -> Vec<u8> {
        let mut context = md5::Context::new();
        context.consume(Self::pad_password(password));
        context.consume(&self.o);
        context.consume(self.p.to_le_bytes());
        context.consume(&self.docid);
        if self.r == 4 && !self.encrypt_metadata {
            context.consume([0xff, 0xff, 0xff, 0xff]);
        }
        let mut result = context.finalize().0.to_vec();

        let n = self.key_bytes();
        if self.r >= 3 {
            for _ in 0..50 {
                result = md5::compute(&result[..n]).0.to_vec();
            }
        }
        result.truncate(n);
        result
    }

    /// Algorithms 4 and 5: the /U value a key would produce.
    fn compute_u_value(&self, key: &[u8]) -> Vec<u8> {
        if self.r == 2 {
            return rc4(key, &PASSWORD_PADDING);
        }
        let mut context = md5::Context::new();
        context.consume(PASSWORD_PADDING);
        context.consume(&self.docid);
        let hash = context.finalize();

        let mut result = rc4(key, &hash.0);
        for i in 1..20u8 {
            let xor_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            result = rc4(&xor_key, &result);
        }
        result
    }

    fn verify_encryption_key(&self, key: &[u8]) -> bool {
        let computed = self.compute_u_value(key);
        if self.r == 2 {
            computed == self.u
        } else {
            computed.len() >= 16 && self.u.len() >= 16 && computed[..16] == self.u[..16]
        }
    }

    fn authenticate_user_password(&self, password: &[u8]) -> Option<Vec<u8>> {
        let key = self.compute_encryption_key(password);
        self.verify_encryption_key(&key).then_some(key)
    }

    /// Algorithm 7: recover the user password from /O, then
    /// authenticate with it.
    fn authenticate_owner_password(&self, password: &[u8]) -> Option<Vec<u8>> {
        let mut hash = md5::compute(Self::pad_password(password)).0.to_vec();
        if self.r >= 3 {
            for _ in 0..50 {
                hash = md5::compute(&hash).0.to_vec();
            }
        }
        let key = &hash[..self.key_bytes()];

        let user_password = if self.r == 2 {
            rc4(key, &self.o)
        } else {
            let mut result = self.o.clone();
            for i in (0..20u8).rev() {
                let xor_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
                result = rc4(&xor_key, &result);
            }
            result
        };
        self.authenticate_user_password(&user_password)
    }

    /// Per-object key: file key + low 3 bytes of objnum + low 2 of
    /// gennum (+ the AES salt for /AESV2), MD5'd and truncated.
    fn object_key(&self, objnum: u32, gennum: u32, aes: bool) -> Vec<u8> {
        let mut key_data = self.key.clone();
        key_data.extend_from_slice(&objnum.to_le_bytes()[..3]);
        key_data.extend_from_slice(&gennum.to_le_bytes()[..2]);
        if aes {
            key_data.extend_from_slice(b"sAlT");
        }
        let hash = md5::compute(&key_data);
        let key_len = (self.key.len() + 5).min(16);
        hash.0[..key_len].to_vec()
    }

    fn decrypt_with_method(
        &self,
        method: CryptMethod,
        objnum: u32,
        gennum: u32,
        data: &[u8],
    ) -> Vec<u8> {
        match method {
            CryptMethod::Identity => data.to_vec(),
            CryptMethod::Rc4 => {
                let key = self.object_key(objnum, gennum, false);
                rc4(&key, data)
            }
            CryptMethod::Aes128 => {
                let key = self.object_key(objnum, gennum, true);
                aes_decrypt_with_iv(&key, data).unwrap_or_else(|| data.to_vec())
            }
        }
    }

    fn is_metadata_stream(attrs: &Dict) -> bool {
        matches!(attrs.get_name("Type"), Some("Metadata"))
            || matches!(attrs.get_name("Subtype"), Some("XML"))
    }
}

impl SecurityHandler for StandardSecurityHandler {
    fn decrypt_string(&self, objnum: u32, gennum: u32, data: &[u8]) -> Vec<u8> {
        self.decrypt_with_method(self.string_method, objnum, gennum, data)
    }

    fn decrypt_stream(&self, objnum: u32, gennum: u32, data: &[u8], attrs: &Dict) -> Vec<u8> {
        if !self.encrypt_metadata && Self::is_metadata_stream(attrs) {
            return data.to_vec();
        }
        self.decrypt_with_method(self.stream_method, objnum, gennum, data)
    }

    fn permissions(&self) -> u32 {
        self.p
    }

    fn is_metadata_encrypted(&self) -> bool {
        self.encrypt_metadata
    }
}

fn resolve_crypt_method(cf: Option<&Dict>, name: &str) -> Result<CryptMethod> {
    if name == "Identity" {
        return Ok(CryptMethod::Identity);
    }
    let cf = cf.ok_or_else(|| PdfError::EncryptionError("missing /CF".into()))?;
    let filter = match cf.get(name) {
        Some(PdfObject::Dict(d)) => d,
        _ => {
            return Err(PdfError::EncryptionError(format!(
                "crypt filter {name} not found"
            )))
        }
    };
    match filter.get_name("CFM") {
        Some("V2") => Ok(CryptMethod::Rc4),
        Some("AESV2") => Ok(CryptMethod::Aes128),
        Some("None") | None => Ok(CryptMethod::Identity),
        Some(other) => Err(PdfError::Handler(format!("crypt filter method {other}"))),
    }
}

fn get_string(dict: &Dict, key: &str) -> Result<Vec<u8>> {
    match dict.get(key) {
        Some(PdfObject::String(s)) => Ok(s.clone()),
        _ => Err(PdfError::EncryptionError(format!("missing /{key}"))),
    }
}

/// Build a security handler from the trailer's /Encrypt dictionary.
///
/// Only the /Standard filter is understood; anything else reports
/// `Handler`, a wrong password reports `Password`.
pub fn create_security_handler(
    encrypt: &Dict,
    docid: &[u8],
    password: &[u8],
) -> Result<Box<dyn SecurityHandler>> {
    let filter = encrypt.get_name("Filter").unwrap_or("");
    if filter != "Standard" {
        return Err(PdfError::Handler(filter.to_string()));
    }
    let handler = StandardSecurityHandler::new(encrypt, docid, password)?;
    Ok(Box::new(handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encrypt_dict(r: i64, o: Vec<u8>, u: Vec<u8>, p: i64) -> Dict {
        let mut d = Dict::new();
        d.insert("Filter".into(), PdfObject::Name("Standard".into()));
        d.insert("R".into(), PdfObject::Int(r));
        d.insert("V".into(), PdfObject::Int(if r == 2 { 1 } else { 2 }));
        d.insert("Length".into(), PdfObject::Int(if r == 2 { 40 } else { 128 }));
        d.insert("O".into(), PdfObject::String(o));
        d.insert("U".into(), PdfObject::String(u));
        d.insert("P".into(), PdfObject::Int(p));
        d
    }

    /// Build /O and /U values for an R2 file with equal user and owner
    /// passwords, then check the full handshake and decryption.
    #[test]
    fn test_r2_handshake_and_decrypt() {
        let docid = b"fixture-doc-id".to_vec();
        let password = b"secret";
        let p: i64 = -44;

        // Algorithm 3: /O from the owner password
        let padded = StandardSecurityHandler::pad_password(password);
        let hash = md5::compute(padded);
        let o = rc4(&hash.0[..5], &PASSWORD_PADDING);

        // Algorithm 2 by hand for the /U value
        let mut ctx = md5::Context::new();
        ctx.consume(padded);
        ctx.consume(&o);
        ctx.consume((p as u32).to_le_bytes());
        ctx.consume(&docid);
        let key = ctx.finalize().0[..5].to_vec();
        let u = rc4(&key, &PASSWORD_PADDING);

        let dict = encrypt_dict(2, o, u, p);
        let handler = StandardSecurityHandler::new(&dict, &docid, password).unwrap();

        let plaintext = b"decrypt me";
        let mut obj_key = key.clone();
        obj_key.extend_from_slice(&7u32.to_le_bytes()[..3]);
        obj_key.extend_from_slice(&0u32.to_le_bytes()[..2]);
        let obj_key = md5::compute(&obj_key).0[..10].to_vec();
        let ciphertext = rc4(&obj_key, plaintext);

        assert_eq!(handler.decrypt_string(7, 0, &ciphertext), plaintext);
        assert_eq!(handler.permissions(), p as u32);
    }

    #[test]
    fn test_wrong_password_reports_password_error() {
        let docid = b"fixture-doc-id".to_vec();
        let padded = StandardSecurityHandler::pad_password(b"secret");
        let hash = md5::compute(padded);
        let o = rc4(&hash.0[..5], &PASSWORD_PADDING);
        let dict = encrypt_dict(2, o, vec![0u8; 32], -44);

        let err = StandardSecurityHandler::new(&dict, &docid, b"wrong").unwrap_err();
        assert!(matches!(err, PdfError::Password));
    }

    #[test]
    fn test_non_standard_filter_reports_handler_error() {
        let mut dict = Dict::new();
        dict.insert("Filter".into(), PdfObject::Name("Acme.Crypt".into()));
        let err = create_security_handler(&dict, b"", b"").unwrap_err();
        assert!(matches!(err, PdfError::Handler(_)));
    }

    #[test]
    fn test_revision_5_unsupported() {
        let dict = encrypt_dict(5, vec![0u8; 48], vec![0u8; 48], -4);
        let err = create_security_handler(&dict, b"", b"").unwrap_err();
        assert!(matches!(err, PdfError::Handler(_)));
    }
}
