//! Atomic file writes for the export/import surface (SPEC_FULL.md §6).

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `content` to `path` atomically: write to a sibling `.tmp` file,
/// fsync, then rename over the destination. If any step fails, the
/// original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or any file
/// operation fails.
pub fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("export.json");
    let temp_path = path.with_file_name(format!("{file_name}.tmp"));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}
