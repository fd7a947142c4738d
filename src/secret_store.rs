//! Storage for the credentials the reporter sends: the optional backend secret
//! key (`X-Secret-Key`) and the GitHub token used by the `github_api` strategy.
//!
//! Lookup order is the credential's environment variables, the OS keyring,
//! then an encrypted file under the app's `secrets` directory for platforms
//! without a usable keyring.

use crate::app_dirs;
use std::path::{Path, PathBuf};

/// Environment variable that takes precedence over any stored backend key.
pub const SECRET_KEY_ENV: &str = "GOOSE_SERVER__SECRET_KEY";
/// Environment variables that take precedence over a stored GitHub token.
pub const GITHUB_TOKEN_ENVS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];
/// Set to `1`/`true` to bypass the OS keyring entirely.
pub const DISABLE_KEYRING_ENV: &str = "FAILURE_REPORT_DISABLE_KEYRING";

const KEYRING_SERVICE: &str = "failure-report";
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    #[error("Secret store unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Crypto error: {0}")]
    Crypto(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("App dir error: {0}")]
    AppDir(#[from] app_dirs::AppDirError),
}

/// Which credential a [`SecretKeyStore`] manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretKind {
    BackendKey,
    GithubToken,
}

impl SecretKind {
    fn env_vars(self) -> &'static [&'static str] {
        match self {
            Self::BackendKey => &[SECRET_KEY_ENV],
            Self::GithubToken => &GITHUB_TOKEN_ENVS,
        }
    }

    fn keyring_key(self) -> &'static str {
        match self {
            Self::BackendKey => "backend_secret_key",
            Self::GithubToken => "github_token",
        }
    }

    fn file_stem(self) -> &'static str {
        match self {
            Self::BackendKey => "backend_secret",
            Self::GithubToken => "github_token",
        }
    }

    /// Human-facing name used by the secret CLI.
    pub fn label(self) -> &'static str {
        match self {
            Self::BackendKey => "Backend secret key",
            Self::GithubToken => "GitHub token",
        }
    }
}

/// Where a resolved secret key came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretSource {
    Environment,
    Keyring,
    EncryptedFile,
}

#[derive(Clone, Debug)]
pub struct SecretKeyStore {
    kind: SecretKind,
    fallback_dir: PathBuf,
}

impl SecretKeyStore {
    pub fn new(kind: SecretKind) -> Result<Self, SecretStoreError> {
        Ok(Self::with_fallback_dir(kind, app_dirs::secrets_dir()?))
    }

    pub fn with_fallback_dir(kind: SecretKind, fallback_dir: PathBuf) -> Self {
        Self { kind, fallback_dir }
    }

    pub fn kind(&self) -> SecretKind {
        self.kind
    }

    /// Resolve the secret key, if one is configured anywhere.
    pub fn get(&self) -> Result<Option<String>, SecretStoreError> {
        Ok(self.get_with_source()?.map(|(key, _)| key))
    }

    pub fn get_with_source(&self) -> Result<Option<(String, SecretSource)>, SecretStoreError> {
        let from_env = self.kind.env_vars().iter().find_map(|name| {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        });
        if let Some(key) = from_env {
            return Ok(Some((key, SecretSource::Environment)));
        }
        if let Some(key) = self.try_keyring_get()? {
            return Ok(Some((key, SecretSource::Keyring)));
        }
        Ok(self
            .fallback_get()?
            .map(|key| (key, SecretSource::EncryptedFile)))
    }

    /// Persist the key, preferring the keyring and falling back to the encrypted file.
    pub fn set(&self, key: &str) -> Result<SecretSource, SecretStoreError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(SecretStoreError::Decode("secret key is empty".into()));
        }
        if self.try_keyring_set(key).is_ok() {
            let _ = self.fallback_delete();
            return Ok(SecretSource::Keyring);
        }
        self.fallback_set(key)?;
        Ok(SecretSource::EncryptedFile)
    }

    /// Remove the stored key from both the keyring and the encrypted file.
    ///
    /// Both are attempted; the keyring error wins when both fail. Nothing
    /// stored is not an error.
    pub fn delete(&self) -> Result<(), SecretStoreError> {
        let keyring = self.try_keyring_delete();
        let file = self.fallback_delete();
        keyring.and(file)
    }

    fn try_keyring_get(&self) -> Result<Option<String>, SecretStoreError> {
        if keyring_disabled() {
            return Ok(None);
        }
        let entry = self.keyring_entry()?;
        match entry.get_password() {
            Ok(key) => Ok(Some(key)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => {
                tracing::debug!("Keyring lookup failed, trying file fallback: {err}");
                Ok(None)
            }
        }
    }

    fn try_keyring_set(&self, key: &str) -> Result<(), SecretStoreError> {
        if keyring_disabled() {
            return Err(SecretStoreError::Unavailable("keyring disabled".into()));
        }
        let entry = self.keyring_entry()?;
        entry
            .set_password(key)
            .map_err(|err| SecretStoreError::Unavailable(err.to_string()))
    }

    fn try_keyring_delete(&self) -> Result<(), SecretStoreError> {
        if keyring_disabled() {
            return Ok(());
        }
        keyring_delete_result(self.keyring_entry()?.delete_credential())
    }

    fn keyring_entry(&self) -> Result<keyring::Entry, SecretStoreError> {
        keyring::Entry::new(KEYRING_SERVICE, self.kind.keyring_key())
            .map_err(|err| SecretStoreError::Unavailable(err.to_string()))
    }

    fn fallback_secret_path(&self) -> PathBuf {
        self.fallback_dir.join(format!("{}.bin", self.kind.file_stem()))
    }

    fn fallback_key_path(&self) -> PathBuf {
        self.fallback_dir.join(format!("{}.key", self.kind.file_stem()))
    }

    fn fallback_get(&self) -> Result<Option<String>, SecretStoreError> {
        let secret_path = self.fallback_secret_path();
        if !secret_path.exists() {
            return Ok(None);
        }
        let data = std::fs::read(secret_path)?;
        if data.len() < NONCE_LEN {
            return Err(SecretStoreError::Decode("secret file too short".into()));
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let key_bytes = std::fs::read(self.fallback_key_path())?;
        if key_bytes.len() != KEY_LEN {
            return Err(SecretStoreError::Decode("secret key file invalid".into()));
        }
        let plaintext = decrypt(&key_bytes, nonce, ciphertext)?;
        String::from_utf8(plaintext)
            .map(Some)
            .map_err(|err| SecretStoreError::Decode(err.to_string()))
    }

    fn fallback_set(&self, secret: &str) -> Result<(), SecretStoreError> {
        std::fs::create_dir_all(&self.fallback_dir)?;
        let key_path = self.fallback_key_path();
        let key_bytes = if key_path.exists() {
            std::fs::read(&key_path)?
        } else {
            let bytes = random_bytes(KEY_LEN)?;
            write_private_file(&key_path, &bytes)?;
            bytes
        };
        if key_bytes.len() != KEY_LEN {
            return Err(SecretStoreError::Decode("secret key file invalid".into()));
        }
        let nonce = random_bytes(NONCE_LEN)?;
        let ciphertext = encrypt(&key_bytes, &nonce, secret.as_bytes())?;
        let mut payload = Vec::with_capacity(nonce.len() + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        write_private_file(&self.fallback_secret_path(), &payload)
    }

    fn fallback_delete(&self) -> Result<(), SecretStoreError> {
        let secret = remove_if_present(&self.fallback_secret_path());
        let key = remove_if_present(&self.fallback_key_path());
        secret.and(key)
    }
}

fn keyring_delete_result(result: Result<(), keyring::Error>) -> Result<(), SecretStoreError> {
    match result {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(err) => Err(SecretStoreError::Unavailable(err.to_string())),
    }
}

fn remove_if_present(path: &Path) -> Result<(), SecretStoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn keyring_disabled() -> bool {
    std::env::var(DISABLE_KEYRING_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn random_bytes(len: usize) -> Result<Vec<u8>, SecretStoreError> {
    use rand::TryRngCore;
    let mut out = vec![0u8; len];
    rand::rngs::OsRng
        .try_fill_bytes(&mut out)
        .map_err(|err| SecretStoreError::Unavailable(err.to_string()))?;
    Ok(out)
}

fn write_private_file(path: &Path, bytes: &[u8]) -> Result<(), SecretStoreError> {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    file.write_all(bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

fn encrypt(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SecretStoreError> {
    use chacha20poly1305::aead::{Aead, KeyInit};
    let cipher = chacha20poly1305::ChaCha20Poly1305::new_from_slice(key)
        .map_err(|err| SecretStoreError::Crypto(err.to_string()))?;
    cipher
        .encrypt(chacha20poly1305::Nonce::from_slice(nonce), plaintext)
        .map_err(|err| SecretStoreError::Crypto(err.to_string()))
}

fn decrypt(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, SecretStoreError> {
    use chacha20poly1305::aead::{Aead, KeyInit};
    let cipher = chacha20poly1305::ChaCha20Poly1305::new_from_slice(key)
        .map_err(|err| SecretStoreError::Crypto(err.to_string()))?;
    cipher
        .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext)
        .map_err(|err| SecretStoreError::Crypto(err.to_string()))
}
