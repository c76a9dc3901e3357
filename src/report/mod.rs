//! Report export for the presentation shell.

pub mod export;

pub use export::ReportEnvelope;
