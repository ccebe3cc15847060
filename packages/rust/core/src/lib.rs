//! Document structuring and question answering for pagewise.
//!
//! Turns extracted document text into an outline of headings, segments the
//! text by that outline, and scopes question answering and summarization to
//! it. The learned inference backend is an injected [`InferenceBackend`]; every
//! entry point degrades to a deterministic fallback when it is missing or
//! fails.

pub mod attribution;
pub mod backend;
pub mod classifier;
pub mod context;
pub mod outline;
pub mod pipeline;
pub mod qa;
pub mod sections;
pub mod summarize;
pub mod summarizer;

pub use attribution::attribute;
pub use backend::{BackendAnswer, BridgeBackend, BridgeConfig, InferenceBackend};
pub use classifier::{Classification, HeadingShape, classify, classify_line};
pub use context::select;
pub use outline::build_outline;
pub use pipeline::{ProgressReporter, SilentProgress, process_document};
pub use qa::{QaEngine, fallback_answer};
pub use sections::{Section, section_for, sections_for};
pub use summarize::{SectionSummaries, SectionSummary, WHOLE_DOCUMENT_KEY, summarize_sections};
pub use summarizer::{DocumentSummarizer, SummaryOptions, extractive_summary};
