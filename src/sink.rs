use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;
use crate::model::ReportDocument;

/// Destination for finished reports.
pub trait ReportSink {
    fn save(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), Error>;
}

/// Writes each report as a file in one directory.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths of every file saved so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ReportSink for DirectorySink {
    fn save(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), Error> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes)?;
        log::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
        self.written.push(path);
        Ok(())
    }
}

/// Keeps reports in memory, in save order.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub files: Vec<(String, Vec<u8>)>,
}

impl ReportSink for MemorySink {
    fn save(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), Error> {
        self.files.push((file_name.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// `photo-report-{case}-{timestamp}.pdf`, with the case number reduced to
/// `[A-Za-z0-9_-]` and `unnumbered` when there is none.
pub fn output_file_name(doc: &ReportDocument, unix_timestamp: u64) -> String {
    let case: String = doc
        .case_number()
        .unwrap_or("")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let case = if case.trim_matches('_').is_empty() {
        "unnumbered".to_string()
    } else {
        case
    };
    format!("photo-report-{case}-{unix_timestamp}.pdf")
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldName;

    #[test]
    fn file_name_sanitizes_case_number() {
        let mut doc = ReportDocument::default();
        doc.fields
            .insert(FieldName::CaseNumber, "KT 17/2024".to_string());
        assert_eq!(
            output_file_name(&doc, 1_700_000_000),
            "photo-report-KT_17_2024-1700000000.pdf"
        );
    }

    #[test]
    fn file_name_without_case_number() {
        let doc = ReportDocument::default();
        assert_eq!(output_file_name(&doc, 5), "photo-report-unnumbered-5.pdf");
    }

    #[test]
    fn directory_sink_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out"));
        sink.save("a.pdf", b"%PDF-").unwrap();
        assert_eq!(sink.written().len(), 1);
        assert_eq!(std::fs::read(&sink.written()[0]).unwrap(), b"%PDF-");
    }
}
