//! Line-ending contract for solver files.
//!
//! Templates are read into `\n`-only text; everything written for the solver
//! uses CRLF and carries no byte-order mark.

use std::io;
use std::path::Path;

use tokio::fs;

const BOM: char = '\u{feff}';

/// Collapse `\r\r\n`, `\r\n` and lone `\r` into `\n`.
pub fn normalize_newlines(raw: &str) -> String {
    raw.replace("\r\r\n", "\n")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Normalize, then expand every newline to CRLF.
pub fn to_crlf(text: &str) -> String {
    normalize_newlines(text).replace('\n', "\r\n")
}

pub async fn read_normalized(path: &Path) -> io::Result<String> {
    let raw = fs::read_to_string(path).await?;
    let raw = raw.strip_prefix(BOM).unwrap_or(&raw);
    Ok(normalize_newlines(raw))
}

pub async fn write_crlf(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, to_crlf(text)).await
}
