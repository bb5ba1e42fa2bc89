use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use super::credentials::{apply_refresh, CredentialStore, TokenPair};

/// Token file name in the cache directory
const TOKEN_FILE: &str = "tokens.json";

/// Credential store persisted as a JSON file.
///
/// The pair is written to a uniquely named, owner-only temporary file and
/// renamed into place, so a reader sees either the previous pair or the new
/// one and other users never see either.
pub struct FileCredentialStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    fn load(&self) -> Result<Option<TokenPair>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read token file")?;
        let pair = serde_json::from_str(&contents).context("Failed to parse token file")?;
        Ok(Some(pair))
    }

    fn save(&self, pair: &TokenPair) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let contents = serde_json::to_string_pretty(pair)?;
        // Created with mode 0600 on unix
        let mut tmp = NamedTempFile::new_in(&self.dir).context("Failed to create token file")?;
        tmp.write_all(contents.as_bytes())
            .context("Failed to write token file")?;
        tmp.persist(self.path())
            .map_err(|e| e.error)
            .context("Failed to replace token file")?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Credential lock poisoned"))
    }
}

impl CredentialStore for FileCredentialStore {
    fn tokens(&self) -> Result<Option<TokenPair>> {
        let _guard = self.lock()?;
        self.load()
    }

    fn store(&self, pair: &TokenPair) -> Result<()> {
        let _guard = self.lock()?;
        self.save(pair)
    }

    fn update_access_token(&self, access_token: &str, rotated_refresh: Option<&str>) -> Result<()> {
        let _guard = self.lock()?;
        let mut pair = self
            .load()?
            .ok_or_else(|| anyhow::anyhow!("No session to refresh"))?;
        apply_refresh(&mut pair, access_token, rotated_refresh);
        self.save(&pair)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}
