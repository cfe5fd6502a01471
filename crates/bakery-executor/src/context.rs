//! Build context packing.
//!
//! The daemon's image-build endpoint takes the build context as a tar
//! stream; directory entries keep their paths relative to the context root.

use bakery_core::{Error, Result};
use bytes::Bytes;
use std::path::Path;

/// Pack a build context directory into an uncompressed tar archive.
pub fn pack_context(dir: &Path) -> Result<Bytes> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!(
            "build context '{}' is not a directory",
            dir.display()
        )));
    }

    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(true);
    builder
        .append_dir_all(".", dir)
        .map_err(|e| Error::Internal(format!("failed to pack build context: {}", e)))?;

    let data = builder
        .into_inner()
        .map_err(|e| Error::Internal(format!("failed to finish context archive: {}", e)))?;

    Ok(Bytes::from(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::io::Read;

    #[test]
    fn test_pack_preserves_paths_and_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM ubuntu:18.04\n").unwrap();
        fs::create_dir(dir.path().join("scripts")).unwrap();
        fs::write(dir.path().join("scripts/setup.sh"), "#!/bin/sh\n").unwrap();

        let tarball = pack_context(dir.path()).unwrap();

        let mut entries = HashMap::new();
        let mut archive = tar::Archive::new(&tarball[..]);
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let path = path.trim_start_matches("./").to_string();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            entries.insert(path, content);
        }

        assert_eq!(entries.get("Dockerfile").map(String::as_str), Some("FROM ubuntu:18.04\n"));
        assert_eq!(
            entries.get("scripts/setup.sh").map(String::as_str),
            Some("#!/bin/sh\n")
        );
    }

    #[test]
    fn test_missing_context_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = pack_context(&missing).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
