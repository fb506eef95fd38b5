mod error;
mod probe;
mod processor;

pub use error::classify_reqwest_error;
pub use processor::HttpUrlProcessor;
