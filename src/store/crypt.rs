//! Record encryption. Every entity is serialized to JSON and sealed in a
//! Fernet token (AES-128-CBC + HMAC-SHA256, random IV per call) before
//! it touches the database; reads reverse the process. Callers only ever
//! see plaintext domain objects.

use fernet::Fernet;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

pub struct Cipher {
    fernet: Fernet,
}

impl Cipher {
    /// Build a cipher from a URL-safe base64 32-byte key, as produced by
    /// the key manager.
    pub fn new(key: &str) -> Result<Self> {
        let fernet = Fernet::new(key)
            .ok_or_else(|| Error::KeyLoad("derived key is not valid for Fernet".into()))?;
        Ok(Cipher { fernet })
    }

    /// Cipher with a throwaway random key, for in-memory stores.
    #[cfg(test)]
    pub fn ephemeral() -> Self {
        Cipher {
            fernet: Fernet::new(&Fernet::generate_key()).expect("fresh key is valid"),
        }
    }

    /// Serialize and seal an entity. Tokens are not deterministic (fresh
    /// IV and timestamp each call), only round-trippable.
    pub fn encrypt<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = serde_json::to_vec(value)?;
        Ok(self.fernet.encrypt(&json))
    }

    /// Open and deserialize a token. `id` identifies the record in the
    /// error when authentication fails.
    pub fn decrypt<T: DeserializeOwned>(&self, id: &str, token: &str) -> Result<T> {
        let plain = self
            .fernet
            .decrypt(token)
            .map_err(|_| Error::Decryption { id: id.to_string() })?;
        Ok(serde_json::from_slice(&plain)?)
    }
}
