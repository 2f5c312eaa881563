pub mod count_source;
pub mod detector_feed;
