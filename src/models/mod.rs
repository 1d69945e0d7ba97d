pub mod bhl_response;
pub mod item;
pub mod name;
pub mod ocr_job;

pub use bhl_response::{parse_page_ids, parse_reference_names, BhlResponseError};
pub use item::{Item, ItemId, PageId};
pub use name::{parse_finder_output, NameEntry, NameRecord};
pub use ocr_job::{OcrJob, OcrPoll, OcrStatus};
