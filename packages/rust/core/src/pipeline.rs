//! End-to-end document processing: raw text → pages → outline → summary.

use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};

use pagewise_shared::{DocumentId, DocumentRecord, content_hash};
use pagewise_text::ExtractedDocument;

use crate::outline::build_outline;
use crate::summarizer::DocumentSummarizer;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each section summary during per-section summarization.
    fn section_summarized(&self, heading: &str, current: usize, total: usize);
    /// Called when a document has been fully processed.
    fn done(&self, record: &DocumentRecord);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn section_summarized(&self, _heading: &str, _current: usize, _total: usize) {}
    fn done(&self, _record: &DocumentRecord) {}
}

/// Process one extracted document into a [`DocumentRecord`].
///
/// `raw_text` is extractor output with pages separated by form feeds. Blank
/// input produces a record with no headings and an empty summary.
#[instrument(skip_all, fields(filename = %filename, size = raw_text.len()))]
pub fn process_document(
    filename: &str,
    raw_text: &str,
    summarizer: &DocumentSummarizer,
    progress: &dyn ProgressReporter,
) -> DocumentRecord {
    let start = Instant::now();

    progress.phase("extract");
    let document = ExtractedDocument::from_raw(raw_text);

    progress.phase("outline");
    let outline = build_outline(&document.full_text, &document.pages);

    progress.phase("summarize");
    let summary = summarizer.summarize(&document.full_text);

    let record = DocumentRecord {
        id: DocumentId::new(),
        filename: filename.to_string(),
        pages: document.pages.len(),
        size: raw_text.len(),
        content_hash: content_hash(raw_text),
        upload_date: Utc::now(),
        headings: outline,
        summary,
        text: document.full_text,
    };

    info!(
        id = %record.id,
        pages = record.pages,
        headings = record.headings.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "document processed"
    );

    progress.done(&record);
    record
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::sections::section_for;
    use crate::summarizer::SummaryOptions;

    const SAMPLE: &str = include_str!("../../../../fixtures/text/sample.txt");

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.events.lock().unwrap().push(format!("phase:{name}"));
        }

        fn section_summarized(&self, heading: &str, current: usize, total: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("section:{heading}:{current}/{total}"));
        }

        fn done(&self, _record: &DocumentRecord) {
            self.events.lock().unwrap().push("done".into());
        }
    }

    fn summarizer() -> DocumentSummarizer {
        DocumentSummarizer::extractive(SummaryOptions::default())
    }

    #[test]
    fn sample_outline_has_expected_levels_and_pages() {
        let record = process_document("sample.txt", SAMPLE, &summarizer(), &SilentProgress);

        let got: Vec<(&str, u8, u32, usize)> = record
            .headings
            .iter()
            .map(|h| (h.text.as_str(), h.level, h.page, h.position))
            .collect();
        assert_eq!(
            got,
            vec![
                ("ANNUAL FIELD REPORT", 2, 1, 0),
                ("1. Introduction", 1, 1, 1),
                ("1.1 Background", 2, 1, 2),
                ("2. Methods", 1, 2, 3),
                ("2.1 Sampling Protocol", 2, 2, 4),
                ("3. Results", 1, 3, 5),
            ]
        );
    }

    #[test]
    fn sample_record_metadata() {
        let record = process_document("sample.txt", SAMPLE, &summarizer(), &SilentProgress);
        assert_eq!(record.filename, "sample.txt");
        assert_eq!(record.pages, 3);
        assert_eq!(record.size, SAMPLE.len());
        assert_eq!(record.content_hash, content_hash(SAMPLE));
        assert_eq!(record.content_hash.len(), 64);
    }

    #[test]
    fn sample_summary_prefers_keyword_sentences() {
        let record = process_document("sample.txt", SAMPLE, &summarizer(), &SilentProgress);
        assert!(record.summary.contains("The main goal was to survey the northern wetlands"));
        assert!(record.summary.contains("A key finding is that nitrate levels fell by a third"));
    }

    #[test]
    fn sample_sections_fold_subsections() {
        let record = process_document("sample.txt", SAMPLE, &summarizer(), &SilentProgress);
        let intro = record.headings.find_by_text("1. Introduction").unwrap();
        let section = section_for(intro, &record.headings, &record.text);
        assert!(section.starts_with("1. Introduction"));
        assert!(section.contains("1.1 Background"));
        assert!(!section.contains("2. Methods"));

        let results = record.headings.find_by_text("3. Results").unwrap();
        let last = section_for(results, &record.headings, &record.text);
        assert!(record.text.ends_with(last));
    }

    #[test]
    fn blank_input_yields_empty_record() {
        let record = process_document("blank.txt", "  \n\n ", &summarizer(), &SilentProgress);
        assert!(record.headings.is_empty());
        assert_eq!(record.summary, "");
    }

    #[test]
    fn reports_phases_in_order() {
        let progress = RecordingProgress::default();
        process_document("sample.txt", SAMPLE, &summarizer(), &progress);
        let events = progress.events.lock().unwrap();
        assert_eq!(
            events.as_slice(),
            ["phase:extract", "phase:outline", "phase:summarize", "done"]
        );
    }

    #[test]
    fn by_section_progress_counts_every_heading() {
        let progress = RecordingProgress::default();
        let record = process_document("sample.txt", SAMPLE, &summarizer(), &SilentProgress);
        let summaries = summarizer().summarize_by_sections(&record.text, &record.headings, &progress);

        assert_eq!(summaries.len(), 6);
        let events = progress.events.lock().unwrap();
        assert_eq!(events.first().map(String::as_str), Some("section:ANNUAL FIELD REPORT:1/6"));
        assert_eq!(events.last().map(String::as_str), Some("section:3. Results:6/6"));
    }
}
