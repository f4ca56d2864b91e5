//! Monthly zip archive extraction.

use std::io::{Cursor, Read as _};

use crate::DownloadError;

/// Picks and reads one CSV out of a zip archive.
///
/// Prefers the first entry whose name contains `expected_filename`; falls
/// back to the first entry ending in `.csv`. Returns the entry name and its
/// contents decoded as lossy UTF-8.
///
/// # Errors
///
/// Returns [`DownloadError::Archive`] if `bytes` is not a zip archive, the
/// archive holds no CSV entry, or the chosen entry cannot be read.
pub fn extract_csv(bytes: &[u8], expected_filename: &str) -> Result<(String, String), DownloadError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| DownloadError::Archive {
        message: format!("invalid zip archive: {e}"),
    })?;

    let names: Vec<String> = archive.file_names().map(String::from).collect();

    let chosen = names
        .iter()
        .find(|name| name.contains(expected_filename))
        .or_else(|| {
            names
                .iter()
                .find(|name| name.to_lowercase().ends_with(".csv"))
        })
        .cloned()
        .ok_or_else(|| DownloadError::Archive {
            message: format!(
                "no entry matching {expected_filename} or any .csv among {} entries",
                names.len()
            ),
        })?;

    if !chosen.contains(expected_filename) {
        log::warn!("{expected_filename} not in archive, using {chosen}");
    }

    let mut entry = archive.by_name(&chosen).map_err(|e| DownloadError::Archive {
        message: format!("cannot open {chosen}: {e}"),
    })?;
    let mut contents = Vec::new();
    entry
        .read_to_end(&mut contents)
        .map_err(|e| DownloadError::Archive {
            message: format!("cannot read {chosen}: {e}"),
        })?;

    Ok((chosen, String::from_utf8_lossy(&contents).into_owned()))
}
