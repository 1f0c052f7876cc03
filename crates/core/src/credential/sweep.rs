//! Credential sweep
//!
//! One pass over the store: orphaned credentials are deleted, expired ones
//! are refreshed or deleted. Scheduling the pass is up to the caller.

use esi_domain::Result;
use tracing::{info, instrument, warn};

use super::ports::{CredentialLifecycle, CredentialStore, RefreshOutcome};
use crate::time::Clock;

/// Counts from one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub orphans_deleted: usize,
    pub refreshed: usize,
    pub discarded: usize,
    pub failed: usize,
    pub still_valid: usize,
}

/// Run one sweep over every stored credential.
///
/// A refresh failing for a transient reason is counted in `failed` and does
/// not stop the sweep.
///
/// # Errors
/// Returns an error when the store cannot be listed or an orphan cannot be
/// deleted.
#[instrument(skip_all)]
pub async fn sweep_credentials(
    store: &dyn CredentialStore,
    lifecycle: &dyn CredentialLifecycle,
    clock: &dyn Clock,
) -> Result<SweepReport> {
    let mut report = SweepReport::default();

    for mut credential in store.list().await? {
        if credential.is_orphaned() {
            store.delete(credential.id).await?;
            report.orphans_deleted += 1;
            continue;
        }
        if !lifecycle.is_expired(&credential, clock.now()) {
            report.still_valid += 1;
            continue;
        }
        match lifecycle.refresh_or_delete(&mut credential).await {
            Ok(RefreshOutcome::Refreshed) => report.refreshed += 1,
            Ok(RefreshOutcome::Deleted) => report.discarded += 1,
            Err(err) => {
                warn!(character_id = credential.character_id, error = %err, "Credential refresh failed during sweep");
                report.failed += 1;
            }
        }
    }

    info!(
        orphans_deleted = report.orphans_deleted,
        refreshed = report.refreshed,
        discarded = report.discarded,
        failed = report.failed,
        "Credential sweep finished"
    );
    Ok(report)
}
