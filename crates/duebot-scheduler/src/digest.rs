//! Daily digest: sweep the book, then nudge every user to check `/tasks`.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use duebot_core::traits::Channel;
use duebot_core::types::UserId;

use crate::book::SweepReport;
use crate::engine::SharedEngine;
use crate::schedule::DailySchedule;

pub const DIGEST_TEXT: &str = "Good morning! Check /tasks to see today's tasks.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestReport {
    pub sweep: SweepReport,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Run one digest pass for `today`, with `now` as the prune clock.
///
/// The engine lock covers the sweep and recipient selection only; messages go
/// out after it is released. Send failures are counted and otherwise ignored.
pub async fn run_digest(
    engine: &SharedEngine,
    channel: &dyn Channel,
    today: NaiveDate,
    now: DateTime<Utc>,
    skip_idle: bool,
) -> DigestReport {
    let mut report = DigestReport::default();

    let recipients: Vec<UserId> = {
        let mut eng = engine.lock().await;
        report.sweep = eng.sweep(today, now);
        eng.users()
            .into_iter()
            .filter(|&user| {
                let keep = !skip_idle || !eng.pending(user, today).is_empty();
                if !keep {
                    report.skipped += 1;
                }
                keep
            })
            .collect()
    };

    for user in recipients {
        // Private chats share the user's id.
        match channel.send_message(user, DIGEST_TEXT, &[]).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::debug!("Digest to {user} not delivered: {e}");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        "Digest for {today}: promoted {}, pruned {}, sent {}, failed {}, skipped {}",
        report.sweep.promoted,
        report.sweep.pruned,
        report.sent,
        report.failed,
        report.skipped
    );
    report
}

/// Digest loop: sleep until the next scheduled time, run, repeat. Never returns.
pub async fn spawn_digest_loop(
    engine: SharedEngine,
    channel: Arc<dyn Channel>,
    schedule: DailySchedule,
    skip_idle: bool,
) {
    tracing::info!("Daily digest scheduled at {schedule}");

    loop {
        let now = Utc::now();
        let wait = schedule.until_next(now);
        tracing::debug!("Next digest in {}s", wait.as_secs());
        tokio::time::sleep(wait).await;

        let now = Utc::now();
        run_digest(&engine, channel.as_ref(), schedule.today(now), now, skip_idle).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReminderEngine;
    use async_trait::async_trait;
    use duebot_core::error::{DueBotError, Result};
    use duebot_core::types::{ChatId, TaskButton};
    use std::sync::Mutex;

    /// Records sends; fails for chat ids in `unreachable`.
    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<(ChatId, String)>>,
        unreachable: Vec<ChatId>,
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send_message(&self, chat_id: ChatId, text: &str, _: &[TaskButton]) -> Result<()> {
            if self.unreachable.contains(&chat_id) {
                return Err(DueBotError::Channel("Forbidden: bot was blocked".into()));
            }
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }

        async fn answer_callback(&self, _: &str) -> Result<()> {
            Ok(())
        }

        async fn edit_message(&self, _: ChatId, _: i64, _: &str) -> Result<()> {
            Ok(())
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_digest_promotes_and_notifies_everyone() {
        let engine = ReminderEngine::in_memory().into_shared();
        {
            let mut eng = engine.lock().await;
            eng.add_task(1, "late", day("2025-03-01"));
            eng.add_task(2, "later", day("2025-04-01"));
        }
        let channel = RecordingChannel::default();
        let report = run_digest(&engine, &channel, day("2025-03-10"), Utc::now(), false).await;

        assert_eq!(report.sweep.promoted, 1);
        assert_eq!(report.sent, 2);
        {
            let sent = channel.sent.lock().unwrap();
            assert_eq!(sent[0], (1, DIGEST_TEXT.to_string()));
            assert_eq!(sent[1].0, 2);
        }

        let eng = engine.lock().await;
        assert_eq!(eng.book().tasks(1)[0].date, day("2025-03-10"));
        assert_eq!(eng.book().tasks(2)[0].date, day("2025-04-01"));
    }

    #[tokio::test]
    async fn test_failed_send_does_not_stop_sweep() {
        let engine = ReminderEngine::in_memory().into_shared();
        {
            let mut eng = engine.lock().await;
            eng.add_task(1, "a", day("2025-03-10"));
            eng.add_task(2, "b", day("2025-03-10"));
        }
        let channel = RecordingChannel {
            unreachable: vec![1],
            ..Default::default()
        };
        let report = run_digest(&engine, &channel, day("2025-03-10"), Utc::now(), false).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 1);
        assert_eq!(channel.sent.lock().unwrap()[0].0, 2);
    }

    #[tokio::test]
    async fn test_skip_idle_users() {
        let engine = ReminderEngine::in_memory().into_shared();
        {
            let mut eng = engine.lock().await;
            eng.add_task(1, "due", day("2025-03-10"));
            eng.add_task(2, "future", day("2025-05-01"));
        }
        let channel = RecordingChannel::default();
        let report = run_digest(&engine, &channel, day("2025-03-10"), Utc::now(), true).await;
        assert_eq!(report.sent, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(channel.sent.lock().unwrap()[0].0, 1);
    }
}
