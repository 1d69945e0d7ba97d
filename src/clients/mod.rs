pub mod bhl_client;
pub mod vision_client;

pub use bhl_client::{BhlClient, MetadataSource};
pub use vision_client::{RecognitionMode, RecognitionService, VisionClient};
