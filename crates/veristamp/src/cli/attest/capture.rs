//! One capture, end to end: pipeline run, host-side retries, persistence.

use std::path::Path;
use std::sync::Arc;

use veristamp_core::attestation::{backoff_duration, is_retryable};
use veristamp_core::{
    AttestationPipeline, AttestationReport, CancelFlag, DirectorySink, FailureKind, Location,
    PersistenceSink, PipelineResult,
};

/// Status shown when a stamped image reached disk.
pub const SAVED_MESSAGE: &str = "Image saved successfully with attestation QR code";

/// Runs captures through the pipeline and stores what comes out.
pub struct CaptureRunner {
    pub pipeline: AttestationPipeline,
    /// `None` when saving is disabled
    pub sink: Option<Arc<dyn PersistenceSink>>,
    pub file_prefix: String,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub cancel: CancelFlag,
}

impl CaptureRunner {
    pub async fn run(&self, path: &Path, location: Option<Location>) -> AttestationReport {
        let (result, attempts) = self.attest_with_retries(path, location).await;
        let mut report = AttestationReport::from_result(path.to_path_buf(), &result, attempts);

        let PipelineResult::Success(capture) = result else {
            return report;
        };
        let Some(sink) = self.sink.clone() else {
            return report;
        };
        if self.cancel.is_cancelled() {
            report.message = "Attested, but not saved: cancelled".to_string();
            return report;
        }

        let file_name =
            DirectorySink::file_name(&self.file_prefix, chrono::Utc::now().timestamp_millis());
        let image = capture.composited_image;
        let saved = tokio::task::spawn_blocking(move || sink.persist(&image, &file_name)).await;
        match saved {
            Ok(Ok(location)) => {
                report.output_path = Some(location);
                report.message = SAVED_MESSAGE.to_string();
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to save {:?}: {}", path, e);
                mark_save_failed(&mut report, &e);
            }
            Err(e) => {
                tracing::error!("Save task for {:?} failed: {}", path, e);
                mark_save_failed(&mut report, &e);
            }
        }
        report
    }

    /// Re-invoke the pipeline on transport failures, up to `retry_attempts` extra times.
    async fn attest_with_retries(
        &self,
        path: &Path,
        location: Option<Location>,
    ) -> (PipelineResult, u32) {
        let mut attempt = 0;
        loop {
            let result = self
                .pipeline
                .attest_and_annotate_with_cancel(path, location, &self.cancel)
                .await;

            if attempt >= self.retry_attempts || !is_retryable(&result) || self.cancel.is_cancelled()
            {
                return (result, attempt + 1);
            }

            let delay = backoff_duration(attempt, self.retry_delay_ms);
            tracing::warn!(
                "{} - retrying {:?} in {:?} (attempt {}/{})",
                result.human_message(),
                path,
                delay,
                attempt + 1,
                self.retry_attempts
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// An attested capture that never reached disk still counts as a failure.
/// The attestation fields stay on the report.
fn mark_save_failed(report: &mut AttestationReport, cause: &dyn std::fmt::Display) {
    report.status = "failed".to_string();
    report.kind = Some(FailureKind::Persistence);
    report.output_path = None;
    report.message = format!("Failed to save image: {cause}");
}

/// The one-line status a user sees for a finished capture.
pub fn status_line(report: &AttestationReport) -> String {
    match report.kind {
        Some(_) => format!("Error: {}", report.message),
        None => report.message.clone(),
    }
}
