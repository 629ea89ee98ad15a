pub mod client;
pub mod source;

pub use client::HttpRecordSource;
pub use source::{RecordSource, SourceError, PAGE_SIZE};
