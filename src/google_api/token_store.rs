//! token.json persistence.
//!
//! The token file holds a refresh token, so its directory is `0700` and the
//! file itself `0600` on unix.

use std::path::Path;

use super::{GoogleApiError, GoogleToken};

/// Load the token from the default location.
pub fn load_token() -> Result<GoogleToken, GoogleApiError> {
    load_token_from(&super::token_path())
}

/// Persist the token to the default location.
pub fn save_token(token: &GoogleToken) -> Result<(), GoogleApiError> {
    save_token_to(&super::token_path(), token)
}

pub fn load_token_from(path: &Path) -> Result<GoogleToken, GoogleApiError> {
    if !path.exists() {
        return Err(GoogleApiError::TokenNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_token_to(path: &Path, token: &GoogleToken) -> Result<(), GoogleApiError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
    }

    let content = serde_json::to_string_pretty(token)?;
    crate::util::atomic_write_str(path, &content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
