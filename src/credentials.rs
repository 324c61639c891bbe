use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::errors::ConfigurationError;

/// Read the API key from `path`, trimmed of surrounding whitespace.
pub fn load_api_key(path: impl AsRef<Path>) -> Result<String, ConfigurationError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ConfigurationError::MissingCredential {
            path: path.to_path_buf(),
        },
        _ => ConfigurationError::UnreadableCredential {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let key = contents.trim();
    if key.is_empty() {
        return Err(ConfigurationError::EmptyCredential {
            path: path.to_path_buf(),
        });
    }
    Ok(key.to_string())
}
