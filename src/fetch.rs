//! Download helpers used when the lemma data or the grammar corpus is missing locally.

use std::{fs, path::Path};

use tempfile::NamedTempFile;
use tracing::info;
use zip::ZipArchive;

use crate::{
    errors::{DownloadError, LemmatizerError, Result},
    utils::paths::has_lemma_data,
};

/// Downloads a zip archive and unpacks it into `dest_dir`.
pub fn fetch_unzip(url: &str, dest_dir: &Path) -> Result<(), DownloadError> {
    fs::create_dir_all(dest_dir)?;

    info!("downloading {}", url);
    let mut response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        return Err(DownloadError::HttpStatus(response.status()));
    }

    let mut temp_file = NamedTempFile::new_in(dest_dir)?;
    let size = response.copy_to(&mut temp_file)?;
    info!("downloaded {} bytes, unpacking into {}", size, dest_dir.display());

    let mut archive = ZipArchive::new(temp_file.reopen()?)?;
    archive.extract(dest_dir)?;
    Ok(())
}

/// Makes sure `data_dir` holds a prebuilt index, fetching the packaged one if not.
pub fn ensure_lemma_data(data_dir: &Path, url: &str) -> Result<()> {
    if has_lemma_data(data_dir) {
        return Ok(());
    }
    info!("lemma data missing in {}", data_dir.display());
    fetch_unzip(url, data_dir)
        .map_err(|e| LemmatizerError::data_unavailable(data_dir, format!("fetch failed: {e}")))?;

    if !has_lemma_data(data_dir) {
        return Err(LemmatizerError::data_unavailable(
            data_dir,
            "downloaded archive does not contain lemma data",
        ));
    }
    Ok(())
}

fn dir_empty(dir_path: &Path) -> Result<bool> {
    if !dir_path.exists() {
        return Ok(true);
    }
    Ok(fs::read_dir(dir_path)?.next().is_none())
}

/// Fetches the grammar corpus into `corpus_dir` when the directory is missing or empty.
pub fn ensure_corpus(corpus_dir: &Path, url: &str) -> Result<()> {
    if !dir_empty(corpus_dir)? {
        info!("corpus status: OK");
        return Ok(());
    }
    info!("corpus status: missing, downloading");
    fetch_unzip(url, corpus_dir)
        .map_err(|e| LemmatizerError::data_unavailable(corpus_dir, format!("fetch failed: {e}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::utils::paths::{
        get_disk_table_metadata_path, get_disk_table_path, get_lemma_data_path,
    };
    use std::{
        io::{Cursor, Read, Write},
        net::TcpListener,
    };
    use tempfile::tempdir;
    use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

    pub(crate) fn zip_archive<C: AsRef<[u8]>>(files: &[(&str, C)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, contents) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents.as_ref()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    // answers a single GET with `body` and returns the url to fetch it from
    pub(crate) fn serve_once(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(header.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });
        format!("http://{addr}/lemma_data.zip")
    }

    #[test]
    fn test_has_lemma_data_accepts_json_or_table() {
        let dir = tempdir().unwrap();
        assert!(!has_lemma_data(dir.path()));

        fs::write(get_disk_table_path(dir.path()), b"").unwrap();
        assert!(!has_lemma_data(dir.path()));
        fs::write(get_disk_table_metadata_path(dir.path()), b"").unwrap();
        assert!(has_lemma_data(dir.path()));

        let other = tempdir().unwrap();
        fs::write(get_lemma_data_path(other.path()), b"{}").unwrap();
        assert!(has_lemma_data(other.path()));
    }

    #[test]
    fn test_ensure_lemma_data_skips_fetch_when_present() {
        let dir = tempdir().unwrap();
        fs::write(get_lemma_data_path(dir.path()), b"{}").unwrap();
        // the url is never contacted
        ensure_lemma_data(dir.path(), "http://127.0.0.1:9/unreachable.zip").unwrap();
    }

    #[test]
    fn test_ensure_lemma_data_reports_unreachable_source() {
        let dir = tempdir().unwrap();
        let result = ensure_lemma_data(dir.path(), "http://127.0.0.1:9/unreachable.zip");
        assert!(matches!(
            result,
            Err(LemmatizerError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_ensure_corpus_keeps_existing_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.xml"), "<Wordlist/>").unwrap();
        ensure_corpus(dir.path(), "http://127.0.0.1:9/unreachable.zip").unwrap();
    }

    #[test]
    fn test_fetch_unzip_extracts_archive() {
        let dir = tempdir().unwrap();
        let url = serve_once(zip_archive(&[("nouns/a.xml", b"<Wordlist/>")]));

        fetch_unzip(&url, dir.path()).unwrap();
        assert_eq!(fs::read(dir.path().join("nouns/a.xml")).unwrap(), b"<Wordlist/>");
    }

    #[test]
    fn test_ensure_lemma_data_fetches_json_artifact() {
        let dir = tempdir().unwrap();
        let json = r#"{"change":{"дома":"дом|N"},"leave":["дом"]}"#.as_bytes();
        let url = serve_once(zip_archive(&[("lemma_data.json", json)]));

        ensure_lemma_data(dir.path(), &url).unwrap();
        assert!(has_lemma_data(dir.path()));
    }

    #[test]
    fn test_ensure_lemma_data_rejects_foreign_archive() {
        let dir = tempdir().unwrap();
        let url = serve_once(zip_archive(&[("lemma_data.sqlite3", b"SQLite format 3\0")]));

        assert!(matches!(
            ensure_lemma_data(dir.path(), &url),
            Err(LemmatizerError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_ensure_corpus_reports_unreachable_source() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            ensure_corpus(&dir.path().join("corpus"), "http://127.0.0.1:9/unreachable.zip"),
            Err(LemmatizerError::DataUnavailable { .. })
        ));
    }
}
