//! Importing and exporting editor files.
//!
//! Only `.py` and `.txt` files up to [`MAX_FILE_BYTES`] are accepted. These
//! checks run before anything reaches the execution context; a rejection is
//! informational and never changes the execution status.

use std::fs;
use std::path::Path;

use crate::errors::FileRejected;

pub const MAX_FILE_BYTES: u64 = 200 * 1024;

/// Name offered when saving a buffer that was never opened from disk.
pub const DEFAULT_FILE_NAME: &str = "main.py";

const ACCEPTED_EXTENSIONS: &[&str] = &["py", "txt"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFile {
    pub name: String,
    pub text: String,
}

/// Read a source file into the editor.
///
/// # Examples
///
/// ```rust,ignore
/// let file = import_file(Path::new("script.py"))?;
/// editor.set_text(&file.text);
/// ```
pub fn import_file(path: &Path) -> Result<ImportedFile, FileRejected> {
    check_extension(path)?;

    let meta = fs::metadata(path).map_err(|e| io_error(path, e))?;
    if meta.len() > MAX_FILE_BYTES {
        return Err(FileRejected::TooLarge {
            size: meta.len(),
            limit: MAX_FILE_BYTES,
        });
    }
    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    log::info!("imported {} ({} bytes)", path.display(), text.len());
    Ok(ImportedFile { name, text })
}

/// Write the editor text to `path`, replacing any existing file.
pub fn export_file(path: &Path, text: &str) -> Result<(), FileRejected> {
    check_extension(path)?;

    let size = text.len() as u64;
    if size > MAX_FILE_BYTES {
        return Err(FileRejected::TooLarge {
            size,
            limit: MAX_FILE_BYTES,
        });
    }
    fs::write(path, text).map_err(|e| io_error(path, e))?;
    log::info!("exported {} ({} bytes)", path.display(), size);
    Ok(())
}

fn check_extension(path: &Path) -> Result<(), FileRejected> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    if ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(FileRejected::UnsupportedExtension(extension))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> FileRejected {
    FileRejected::Io {
        path: path.display().to_string(),
        source,
    }
}
