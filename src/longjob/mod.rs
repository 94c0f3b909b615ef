// src/longjob/mod.rs

//! Tracking of experiments across process invocations.

pub mod resume;
pub mod store;

pub use resume::{resume, ResumeSummary, ALL_COMPLETED_LINE};
pub use store::{LongJobRecord, LongJobStore};
