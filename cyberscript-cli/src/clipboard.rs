//! OS clipboard sink for exported reports.

use cyberscript_core::error::{CyberscriptError, Result};
use cyberscript_core::report::ReportSink;

/// Writes report text to the system clipboard via `arboard`.
///
/// The clipboard handle is opened lazily on first write so that headless
/// runs that never copy do not need a display server.
#[derive(Default)]
pub(crate) struct ClipboardSink {
    clipboard: Option<arboard::Clipboard>,
}

impl ClipboardSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for ClipboardSink {
    fn write_text(&mut self, text: &str) -> Result<()> {
        if self.clipboard.is_none() {
            self.clipboard = Some(arboard::Clipboard::new().map_err(clipboard_error)?);
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            clipboard.set_text(text).map_err(clipboard_error)?;
        }
        Ok(())
    }
}

fn clipboard_error(e: arboard::Error) -> CyberscriptError {
    CyberscriptError::Clipboard {
        message: e.to_string(),
    }
}
