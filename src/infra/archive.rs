//! Zip download of a job's solver output.

use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::application::templates::JobPaths;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("output directory `{}` does not exist", .path.display())]
    OutputMissing { path: PathBuf },
    #[error("no result files in `{}`", .path.display())]
    NoResults { path: PathBuf },
    #[error("failed to read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to build zip archive: {0}")]
    Zip(#[from] ZipError),
}

/// Deflated zip of `result.xml` and `result.res`, whichever exist.
pub async fn zip_results(paths: &JobPaths) -> Result<Vec<u8>, ArchiveError> {
    if !tokio::fs::metadata(&paths.output_dir)
        .await
        .is_ok_and(|meta| meta.is_dir())
    {
        return Err(ArchiveError::OutputMissing {
            path: paths.output_dir.clone(),
        });
    }

    let mut members = Vec::new();
    for path in [&paths.result_xml, &paths.result_res] {
        match tokio::fs::read(path).await {
            Ok(bytes) => members.push((member_name(path), bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ArchiveError::Io {
                    path: path.clone(),
                    source,
                });
            }
        }
    }
    if members.is_empty() {
        return Err(ArchiveError::NoResults {
            path: paths.output_dir.clone(),
        });
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in &members {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(bytes).map_err(ZipError::from)?;
    }
    Ok(writer.finish()?.into_inner())
}

fn member_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::JobId;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[tokio::test]
    async fn archives_whichever_results_exist() {
        let dir = TempDir::new().expect("temp dir");
        let paths = JobPaths::for_job(dir.path(), &JobId::from("job"));
        fs::create_dir_all(&paths.output_dir).expect("out dir");
        fs::write(&paths.result_xml, "<equilib/>").expect("xml");

        let bytes = zip_results(&paths).await.expect("archive");
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("zip");
        assert_eq!(archive.len(), 1);
        let mut content = String::new();
        archive
            .by_name("result.xml")
            .expect("member")
            .read_to_string(&mut content)
            .expect("read");
        assert_eq!(content, "<equilib/>");
    }

    #[tokio::test]
    async fn missing_output_and_empty_output_are_distinguished() {
        let dir = TempDir::new().expect("temp dir");
        let paths = JobPaths::for_job(dir.path(), &JobId::from("job"));

        let err = zip_results(&paths).await.expect_err("no dir");
        assert!(matches!(err, ArchiveError::OutputMissing { .. }));

        fs::create_dir_all(&paths.output_dir).expect("out dir");
        let err = zip_results(&paths).await.expect_err("no files");
        assert!(matches!(err, ArchiveError::NoResults { .. }));
    }
}
