//! # DueBot Scheduler
//!
//! Owns the per-user task lists and the once-a-day digest.
//!
//! ## Architecture
//! ```text
//! ReminderEngine (behind Arc<tokio::sync::Mutex<_>>)
//!   ├── TaskBook: user_id → { next_id, [Task] }
//!   └── TaskStore: tasks.json, rewritten after every mutation (optional)
//!
//! Digest loop (tokio sleep until next HH:MM)
//!   ├── sweep: overdue pending → today, prune old done tasks
//!   └── send "Good morning!" to every known user via Channel
//! ```

pub mod book;
pub mod digest;
pub mod engine;
pub mod schedule;
pub mod store;

pub use book::{SweepReport, TaskBook};
pub use digest::{DIGEST_TEXT, DigestReport, run_digest, spawn_digest_loop};
pub use engine::{ReminderEngine, SharedEngine};
pub use schedule::DailySchedule;
pub use store::TaskStore;
