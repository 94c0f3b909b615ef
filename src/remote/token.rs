// src/remote/token.rs

use std::fs;
use std::path::Path;

use crate::errors::{CiError, Result};

/// Read the API token from the first line of `path`.
///
/// On unix the file must not grant any permission to group or others; a
/// missing, empty or too-open file is a startup error.
pub fn load_token(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(CiError::TokenMissing(path.to_path_buf()));
    }

    check_permissions(path)?;

    let contents = fs::read_to_string(path)?;
    let token = contents.lines().next().unwrap_or("").trim().to_string();
    if token.is_empty() {
        return Err(CiError::ConfigError(format!(
            "token file {:?} is empty",
            path
        )));
    }
    Ok(token)
}

#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)?.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(CiError::TokenPermissions {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
