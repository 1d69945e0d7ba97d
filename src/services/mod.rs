pub mod failure_writer;
pub mod name_extractor;
pub mod ocr_driver;
pub mod reference_fetcher;
pub mod result_aggregator;

pub use failure_writer::FailureWriter;
pub use name_extractor::{ExtractionOutcome, FinderOutput, GnfinderCli, NameExtractor, NameFinder};
pub use ocr_driver::OcrDriver;
pub use reference_fetcher::{FetchOutcome, ReferenceFetcher};
pub use result_aggregator::{ResultAggregator, SummaryStats, SUMMARY_HEADER};
