//! Asynchronous triage
//!
//! [`TriageWorker`] drains the event queue, running a [`Triage`] per event.
//! [`Sweeper`] re-queues tickets that stayed `OPEN` for too long.

mod pipeline;
mod retry;
mod sweep;
mod worker;

pub use pipeline::{Triage, TriageOutcome};
pub use retry::{GaveUp, RetryPolicy, with_deadline};
pub use sweep::{Sweeper, stale_open_ids};
pub use worker::TriageWorker;
