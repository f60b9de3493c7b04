use crate::batch::Batch;
use crate::logs_api::LogsApi;
use tracing::{debug, error, info};

/// What happened to a set of batches. Failures are reported, never retried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub sealed: usize,
    pub attempted: usize,
    /// Positions (in the sealed list) of batches CloudWatch Logs refused.
    pub failed: Vec<usize>,
}

impl UploadReport {
    pub fn all_attempted(&self) -> bool {
        self.attempted == self.sealed
    }

    pub fn all_succeeded(&self) -> bool {
        self.all_attempted() && self.failed.is_empty()
    }
}

/// Sends batches one at a time, in order, each sorted by timestamp.
pub async fn send_batches(
    api: &dyn LogsApi,
    batches: Vec<Batch>,
    group: &str,
    stream: &str,
) -> UploadReport {
    let mut report = UploadReport {
        sealed: batches.len(),
        ..Default::default()
    };

    for (index, batch) in batches.into_iter().enumerate() {
        report.attempted += 1;
        if batch.is_empty() {
            debug!("batch {} is empty, nothing to send", index);
            continue;
        }

        let mut events = batch.into_events();
        // PutLogEvents rejects requests that are not in chronological order
        events.sort_by_key(|event| event.timestamp);
        if let Err(e) = api.put_log_events(group, stream, events).await {
            error!(
                "failed to save batch {} to stream {} in group {}: {}",
                index, stream, group, e
            );
            report.failed.push(index);
        }
    }

    if report.all_attempted() {
        info!("successfully sent all batches");
    }
    if !report.failed.is_empty() {
        error!("{} of {} batches failed: {:?}", report.failed.len(), report.sealed, report.failed);
    }
    report
}
