use std::fs::File;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domains::export::types::ExportError;

fn create_archive(files: &[PathBuf], dest_zip: &Path) -> Result<(), String> {
    let file = File::create(dest_zip).map_err(|e| e.to_string())?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| format!("{} has no file name", path.display()))?;
        zip.start_file(name, options).map_err(|e| e.to_string())?;
        let mut f = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        std::io::copy(&mut f, &mut zip).map_err(|e| e.to_string())?;
    }

    zip.finish().map_err(|e| e.to_string())?;
    Ok(())
}

/// Bundle `files` flat into `dest_zip` with deflate compression.
pub async fn package_archive(files: Vec<PathBuf>, dest_zip: PathBuf) -> Result<(), ExportError> {
    let target = dest_zip.clone();
    let count = files.len();
    tokio::task::spawn_blocking(move || create_archive(&files, &target))
        .await
        .map_err(|e| ExportError::Archive(format!("archive task failed: {}", e)))?
        .map_err(ExportError::Archive)?;
    log::info!("Archive written: {} ({} files)", dest_zip.display(), count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[tokio::test]
    async fn archives_files_by_name() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("data_01.txt");
        let b = tmp.path().join("trigger.txt");
        std::fs::write(&a, "header\nrow\n").unwrap();
        std::fs::write(&b, "manifest\n").unwrap();
        let dest = tmp.path().join("bundle.zip");

        package_archive(vec![a, b], dest.clone()).await.unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive.by_name("data_01.txt").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "header\nrow\n");
    }

    #[tokio::test]
    async fn missing_input_is_archive_error() {
        let tmp = tempdir().unwrap();
        let err = package_archive(vec![tmp.path().join("nope.txt")], tmp.path().join("x.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Archive(_)));
    }
}
