//! Processing watcher: poll an uploaded file until the vendor can use it.
//!
//! ## Poll Strategy
//!
//! Fixed interval, fixed attempt count, no backoff and no jitter. The
//! conversion queue on the vendor side does not speed up if we wait longer,
//! and a flat 2 s cadence keeps the worst case bounded at one minute.

use crate::client::EsignApi;
use crate::config::EsignConfig;
use crate::error::{EsignError, Result};
use crate::model::{FileStatusRecord, Readiness};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_millis(2000),
        }
    }
}

impl From<&EsignConfig> for PollPolicy {
    fn from(config: &EsignConfig) -> Self {
        Self {
            max_attempts: config.poll_max_attempts,
            interval: config.poll_interval,
        }
    }
}

/// Poll `file_id` until it is ready, failed, or the budget runs out.
///
/// Returns the final status record on success.
pub async fn wait_until_ready(
    api: &dyn EsignApi,
    file_id: &str,
    policy: PollPolicy,
) -> Result<FileStatusRecord> {
    for attempt in 1..=policy.max_attempts {
        let record = api
            .file_status(file_id)
            .await?
            .or_fail(|message| EsignError::FileStatusQueryFailed { message })?;
        let status = record.file_status;
        debug!(
            "File {}: status {} (check {}/{})",
            file_id,
            status.code(),
            attempt,
            policy.max_attempts
        );

        match status.classify() {
            Readiness::Ready => {
                info!("File {} ready after {} checks", file_id, attempt);
                return Ok(record);
            }
            Readiness::Failed => {
                warn!("File {} processing failed with status {}", file_id, status.code());
                return Err(EsignError::FileProcessingFailed {
                    status: status.code(),
                });
            }
            Readiness::Transient => sleep(policy.interval).await,
        }
    }

    Err(EsignError::FileProcessingTimeout {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ApiOutcome, CreateFlowRequest, CreatedFlow, FileStatus, SignFlowDetail, SignUrl,
        SignUrlRequest, UploadSlot, UploadSlotRequest,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Answers file status queries from a script; repeats the last entry.
    struct ScriptedStatus {
        script: Mutex<VecDeque<i64>>,
        last: i64,
        polls: AtomicUsize,
    }

    impl ScriptedStatus {
        fn new(codes: &[i64]) -> Self {
            Self {
                script: Mutex::new(codes.iter().copied().collect()),
                last: *codes.last().unwrap(),
                polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EsignApi for ScriptedStatus {
        async fn request_upload_slot(
            &self,
            _request: &UploadSlotRequest,
        ) -> Result<ApiOutcome<UploadSlot>> {
            unimplemented!()
        }

        async fn put_file(&self, _: &str, _: Vec<u8>, _: &str, _: &str) -> Result<()> {
            unimplemented!()
        }

        async fn create_flow(&self, _: &CreateFlowRequest) -> Result<ApiOutcome<CreatedFlow>> {
            unimplemented!()
        }

        async fn sign_url(&self, _: &str, _: &SignUrlRequest) -> Result<ApiOutcome<SignUrl>> {
            unimplemented!()
        }

        async fn flow_detail(&self, _: &str) -> Result<ApiOutcome<SignFlowDetail>> {
            unimplemented!()
        }

        async fn file_status(&self, file_id: &str) -> Result<ApiOutcome<FileStatusRecord>> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let code = self.script.lock().unwrap().pop_front().unwrap_or(self.last);
            Ok(ApiOutcome::Success(FileStatusRecord {
                file_id: file_id.to_string(),
                file_name: None,
                file_status: FileStatus::from(code),
                file_download_url: None,
                file_total_page_count: None,
            }))
        }
    }

    fn policy(ms: u64) -> PollPolicy {
        PollPolicy {
            max_attempts: 30,
            interval: Duration::from_millis(ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ready_after_two_waits() {
        let api = ScriptedStatus::new(&[4, 4, 2]);
        let start = Instant::now();

        let record = wait_until_ready(&api, "f1", policy(500)).await.unwrap();

        assert_eq!(record.file_status, FileStatus::UploadComplete);
        assert_eq!(api.polls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_status_fails_without_waiting() {
        let api = ScriptedStatus::new(&[9]);
        let start = Instant::now();

        let err = wait_until_ready(&api, "f1", policy(2000)).await.unwrap_err();

        assert!(matches!(err, EsignError::FileProcessingFailed { status: 9 }));
        assert_eq!(api.polls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn thirty_transient_statuses_time_out() {
        let api = ScriptedStatus::new(&[8]);

        let err = wait_until_ready(&api, "f1", PollPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EsignError::FileProcessingTimeout { attempts: 30 }));
        assert_eq!(api.polls.load(Ordering::SeqCst), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn convert_complete_is_ready() {
        let api = ScriptedStatus::new(&[1, 5]);
        let record = wait_until_ready(&api, "f1", policy(10)).await.unwrap();
        assert_eq!(record.file_status, FileStatus::ConvertComplete);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_keeps_polling() {
        let api = ScriptedStatus::new(&[42, 2]);
        wait_until_ready(&api, "f1", policy(10)).await.unwrap();
        assert_eq!(api.polls.load(Ordering::SeqCst), 2);
    }
}
