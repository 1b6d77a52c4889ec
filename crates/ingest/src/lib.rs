//! 多源信号采集管线：拉取、归一化、分级与批量落库。
//!
//! ```text
//! Scheduler → IngestCycle → FeedProvider (逐源) → normalize → SignalSink
//!                                                ├─ infer_pair
//!                                                └─ classify
//! ```

pub mod cycle;
pub mod error;
pub mod fields;
pub mod grade;
pub mod normalize;
pub mod pair;
pub mod scheduler;

pub use cycle::{CycleRunner, CycleSummary, IngestCycle, SourceFailure};
pub use error::IngestError;
pub use grade::classify;
pub use normalize::{Normalizer, normalize_at};
pub use pair::infer_pair;
pub use scheduler::{Scheduler, SchedulerReport, SchedulerState};
