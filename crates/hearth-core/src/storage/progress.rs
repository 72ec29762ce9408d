//! Upload progress reporting.

use tokio::sync::mpsc::UnboundedSender;

/// Progress snapshot of one image upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadProgress {
    /// Position of the image in the draft.
    pub index: usize,
    pub file_name: String,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Completion percentage in `0..=100`.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let ratio = self.bytes_transferred.min(self.total_bytes) * 100 / self.total_bytes;
        u8::try_from(ratio).unwrap_or(100)
    }
}

/// Per-upload handle that forwards progress to an optional subscriber.
///
/// Sending never blocks; a dropped receiver silently disables reporting.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    index: usize,
    file_name: String,
    sender: Option<UnboundedSender<UploadProgress>>,
}

impl ProgressReporter {
    pub fn new(
        index: usize,
        file_name: impl Into<String>,
        sender: Option<UnboundedSender<UploadProgress>>,
    ) -> Self {
        Self {
            index,
            file_name: file_name.into(),
            sender,
        }
    }

    /// Reporter with no subscriber.
    pub fn disabled() -> Self {
        Self::new(0, String::new(), None)
    }

    pub fn report(&self, bytes_transferred: u64, total_bytes: u64) {
        let Some(sender) = &self.sender else {
            return;
        };
        let event = UploadProgress {
            index: self.index,
            file_name: self.file_name.clone(),
            bytes_transferred,
            total_bytes,
        };
        tracing::trace!(
            index = event.index,
            percent = event.percent(),
            "Upload progress"
        );
        sender.send(event).ok();
    }
}
