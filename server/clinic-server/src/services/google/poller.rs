//! Periodic calendar pull

use super::sync::CalendarSync;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Run [`CalendarSync::sync_all`] every `period` until the task is aborted.
/// The first run happens one period after start; ticks missed while a run
/// is still going are skipped.
pub fn spawn_calendar_poller(sync: CalendarSync, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(period_secs = period.as_secs(), "Calendar poller started");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let synced = sync.sync_all().await;
            debug!(users = synced, "Periodic calendar sync finished");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::google::calendar_api::MockCalendarApi;
    use crate::services::google::oauth::MockGoogleOAuthProvider;
    use crate::services::google::store::MockGoogleStore;
    use crypto::TokenCipher;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_poller_runs_sync_repeatedly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let mut store = MockGoogleStore::new();
        store.expect_users_with_credentials().returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        });

        let sync = CalendarSync::new(
            Arc::new(store),
            Arc::new(MockCalendarApi::new()),
            Arc::new(MockGoogleOAuthProvider::new()),
            Arc::new(TokenCipher::from_key_source("0123456789abcdef0123456789abcdef").unwrap()),
        );

        let handle = spawn_calendar_poller(sync, Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(110)).await;
        handle.abort();

        assert!(runs.load(Ordering::SeqCst) >= 2);
    }
}
