use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DB_PATH_ENV: &str = "EATTHIS_DB_PATH";
pub const DATA_DIR_ENV: &str = "EATTHIS_DATA_DIR";
pub const ADMIN_TOKEN_ENV: &str = "EATTHIS_ADMIN_TOKEN";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    /// Favorites and shopping-list blobs.
    pub storage_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) => {
                let dir = PathBuf::from(dir);
                info!(path = %dir.display(), "using data directory from {DATA_DIR_ENV}");
                dir
            }
            None => ProjectDirs::from("", "", "eatthis")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        let db_path = match std::env::var_os(DB_PATH_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                info!(path = %path.display(), "using database from {DB_PATH_ENV}");
                path
            }
            None => data_dir.join("eatthis.db"),
        };
        Self::in_dir(&data_dir, db_path)
    }

    fn in_dir(data_dir: &Path, db_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        Ok(Config {
            db_path,
            data_dir: data_dir.to_path_buf(),
            storage_dir: data_dir.join("storage"),
        })
    }

    /// Load the admin token from the environment or disk, or generate a new one.
    ///
    /// Returns `(token, newly_created)` where `newly_created` is true when a
    /// fresh token was just generated (first run).
    pub fn load_or_create_admin_token(&self) -> Result<(String, bool)> {
        if let Ok(token) = std::env::var(ADMIN_TOKEN_ENV) {
            let token = token.trim().to_string();
            if !token.is_empty() {
                info!("using admin token from {ADMIN_TOKEN_ENV}");
                return Ok((token, false));
            }
        }
        self.load_or_create_token_file()
    }

    fn load_or_create_token_file(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("admin_token");

        if path.exists() {
            let token = std::fs::read_to_string(&path).context("Failed to read admin token file")?;
            let token = token.trim().to_string();
            if !token.is_empty() {
                return Ok((token, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let token = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &token).context("Failed to write admin token file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set admin token file permissions")?;
        }
        info!(path = %path.display(), "generated new admin token");
        Ok((token, true))
    }
}
