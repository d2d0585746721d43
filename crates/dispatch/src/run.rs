use {
    mailrun_mail::{Mailer, Message, SendError},
    tracing::{debug, info, warn},
};

use crate::{progress::Progress, recipients::RecipientSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub recipient: String,
    pub detail: String,
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub failures: Vec<Failure>,
}

/// Send `message` to every recipient in order, one at a time.
///
/// Each recipient gets exactly one attempt. Failures are counted and reported
/// through `progress`; they never stop the loop.
pub async fn dispatch(
    mailer: &dyn Mailer,
    recipients: &RecipientSet,
    message: &Message,
    progress: &mut dyn Progress,
) -> DispatchReport {
    let mut report = DispatchReport {
        total: recipients.len(),
        ..Default::default()
    };
    info!(
        transport = mailer.name(),
        total = report.total,
        "starting dispatch"
    );
    progress.started(report.total);

    for to in recipients.iter() {
        match mailer.send(to, message).await {
            Ok(()) => {
                report.sent += 1;
                debug!(%to, "sent");
                progress.sent(report.sent, report.total);
            },
            Err(e) => {
                report.failed += 1;
                if let SendError::Api {
                    payload: Some(ref payload),
                    ..
                } = e
                {
                    debug!(%to, %payload, "mail API error payload");
                }
                let detail = e.to_string();
                warn!(%to, error = %detail, "send failed");
                progress.failed(to, &detail);
                report.failures.push(Failure {
                    recipient: to.to_string(),
                    detail,
                });
            },
        }
    }

    info!(sent = report.sent, failed = report.failed, "dispatch finished");
    progress.finished(&report);
    report
}
