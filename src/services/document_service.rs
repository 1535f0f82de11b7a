use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{Error, Result};

const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(30);

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn to_text(&self, document: &[u8]) -> Result<String>;
}

/// Shells out to poppler's `pdftotext`.
///
/// The scratch copy is a `NamedTempFile` and the child is killed on drop, so
/// an abandoned request leaves neither a file nor a process behind.
#[derive(Debug, Clone)]
pub struct PdfToTextConverter {
    scratch_dir: PathBuf,
    timeout: Duration,
}

impl PdfToTextConverter {
    pub fn new(scratch_dir: PathBuf) -> Self {
        Self {
            scratch_dir,
            timeout: DEFAULT_CONVERSION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for PdfToTextConverter {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

#[async_trait]
impl DocumentConverter for PdfToTextConverter {
    async fn to_text(&self, document: &[u8]) -> Result<String> {
        if !is_pdf(document) {
            return Err(Error::BadRequest("Invalid PDF file content".into()));
        }

        let mut scratch = tempfile::Builder::new()
            .prefix("resume-")
            .suffix(".pdf")
            .tempfile_in(&self.scratch_dir)?;
        scratch.write_all(document)?;
        scratch.flush()?;

        let mut command = Command::new("pdftotext");
        command
            .arg("-layout")
            .arg(scratch.path())
            .arg("-")
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(output) => output.map_err(|e| {
                tracing::error!(error = %e, "Failed to run pdftotext");
                Error::Internal("PDF conversion is unavailable".into())
            })?,
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "pdftotext timed out");
                return Err(Error::BadRequest("PDF conversion timed out".into()));
            }
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(status = %output.status, %stderr, "pdftotext rejected the upload");
            return Err(Error::BadRequest("Could not read text from the PDF".into()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub fn is_pdf(document: &[u8]) -> bool {
    document.starts_with(b"%PDF")
}
