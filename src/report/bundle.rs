//! Zip bundle of a job's artifacts.

use std::fs;
use std::io::{Cursor, Write};

use zip::result::{ZipError, ZipResult};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::converter::Artifacts;

/// Archive holding exactly the HTML, PDF and DOCX, stored under their file names.
pub fn build_zip(artifacts: &Artifacts) -> ZipResult<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for path in artifacts.all() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or(ZipError::FileNotFound)?;
        writer.start_file(name, options)?;
        writer.write_all(&fs::read(path)?)?;
    }

    Ok(writer.finish()?.into_inner())
}
