pub mod cancel;
pub mod output_layout;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use output_layout::{artifact_exists, read_artifact, write_artifact, write_lines, OutputLayout};
