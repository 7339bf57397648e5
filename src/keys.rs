//! Key manager: derives the persistent symmetric key that encrypts every
//! record in the database.
//!
//! Two files live next to the database, both owner-only on POSIX:
//! a random master key and a random salt. The working key is
//! PBKDF2-HMAC-SHA256(master, salt) encoded for Fernet. Losing either
//! file makes the database permanently unreadable; there is no escrow
//! and no recovery path.

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;

use crate::error::{Error, Result};

pub const KEY_FILE: &str = ".tudu_key";
pub const SALT_FILE: &str = ".tudu_salt";

const MASTER_KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const PBKDF2_ITERATIONS: u32 = 480_000;

/// Load (or create on first run) the master key and salt under
/// `data_dir`, and derive the working encryption key.
///
/// The returned string is URL-safe base64 of 32 bytes, the format
/// Fernet expects. Creating the data directory is idempotent.
pub fn load_or_create(data_dir: &Path) -> Result<String> {
    fs::create_dir_all(data_dir).map_err(|e| {
        Error::KeyLoad(format!(
            "cannot create data directory {}: {e}",
            data_dir.display()
        ))
    })?;

    let master = load_or_create_master_key(&data_dir.join(KEY_FILE))?;
    let salt = load_or_create_salt(&data_dir.join(SALT_FILE))?;
    Ok(derive_key(&master, &salt))
}

fn derive_key(master: &[u8], salt: &[u8]) -> String {
    let mut derived = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(master, salt, PBKDF2_ITERATIONS, &mut derived);
    URL_SAFE.encode(derived)
}

fn load_or_create_master_key(path: &Path) -> Result<Vec<u8>> {
    if path.exists() {
        verify_permissions(path)?;
        let text = fs::read_to_string(path)
            .map_err(|e| Error::KeyLoad(format!("cannot read {}: {e}", path.display())))?;
        let decoded = URL_SAFE.decode(text.trim()).map_err(|_| {
            Error::KeyLoad(format!("{} is not valid key material", path.display()))
        })?;
        if decoded.len() != MASTER_KEY_LEN {
            return Err(Error::KeyLoad(format!(
                "{} holds {} bytes of key material, expected {MASTER_KEY_LEN}",
                path.display(),
                decoded.len()
            )));
        }
        Ok(decoded)
    } else {
        let key = fernet::Fernet::generate_key();
        fs::write(path, &key)
            .map_err(|e| Error::KeyLoad(format!("cannot write {}: {e}", path.display())))?;
        restrict_permissions(path)?;
        URL_SAFE
            .decode(&key)
            .map_err(|_| Error::KeyLoad("generated key is not valid base64".into()))
    }
}

fn load_or_create_salt(path: &Path) -> Result<Vec<u8>> {
    if path.exists() {
        verify_permissions(path)?;
        let salt = fs::read(path)
            .map_err(|e| Error::KeyLoad(format!("cannot read {}: {e}", path.display())))?;
        if salt.len() != SALT_LEN {
            return Err(Error::KeyLoad(format!(
                "{} holds {} bytes of salt, expected {SALT_LEN}",
                path.display(),
                salt.len()
            )));
        }
        Ok(salt)
    } else {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        fs::write(path, salt)
            .map_err(|e| Error::KeyLoad(format!("cannot write {}: {e}", path.display())))?;
        restrict_permissions(path)?;
        Ok(salt.to_vec())
    }
}

/// Set owner-only read/write on a key file.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
        Error::KeyLoad(format!(
            "cannot restrict permissions on {}: {e}",
            path.display()
        ))
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Reject key files that are readable by group or other. A loose mode is
/// corrected in place; failure to correct it is a load error.
#[cfg(unix)]
fn verify_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = fs::metadata(path)
        .map_err(|e| Error::KeyLoad(format!("cannot stat {}: {e}", path.display())))?;
    if metadata.permissions().mode() & 0o077 != 0 {
        tracing::warn!("{} was group/other accessible, tightening", path.display());
        restrict_permissions(path)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn verify_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
