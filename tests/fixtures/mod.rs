//! Inventory fixtures shared by the integration tests

use std::path::{Path, PathBuf};

/// Path to the sample YAML inventory
pub fn sample_inventory_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/inventory.yml")
}

/// Write `content` to a temp file with the given extension
pub fn write_temp(content: &str, extension: &str) -> tempfile::NamedTempFile {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{}", extension))
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
