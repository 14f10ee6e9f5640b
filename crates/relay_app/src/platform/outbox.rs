use std::io;
use std::path::PathBuf;

use engine_logging::engine_info;
use relay_core::RequestId;
use relay_engine::{
    encode_inbound, InboundFrame, Selector, SubmissionDriver, SubmitError, VisualPage,
};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Hands jobs to the external input helper by appending
/// `{"prompt_id","text"}` lines to an outbox file.
///
/// A job counts as submitted once its line is flushed. Submission is refused
/// while the page shows no input element.
pub struct OutboxSubmitter {
    path: PathBuf,
    page: VisualPage,
    input: Selector,
    input_label: String,
    write_lock: Mutex<()>,
}

impl OutboxSubmitter {
    /// `input_label` is the selector text, used in errors.
    pub fn new(path: PathBuf, page: VisualPage, input: Selector, input_label: impl Into<String>) -> Self {
        Self {
            path,
            page,
            input,
            input_label: input_label.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait::async_trait]
impl SubmissionDriver for OutboxSubmitter {
    async fn submit(&self, id: &RequestId, text: &str) -> Result<(), SubmitError> {
        if self.page.query(&self.input).is_none() {
            return Err(SubmitError::InputUnavailable(self.input_label.clone()));
        }

        let frame = InboundFrame {
            prompt_id: id.clone(),
            text: text.to_string(),
        };
        let mut line = encode_inbound(&frame)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        engine_info!("[{}] written to outbox {:?}", id, self.path);
        Ok(())
    }
}
