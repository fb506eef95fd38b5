mod url_processor;
mod url_store;

pub use url_processor::UrlProcessor;
pub use url_store::{UrlCheckUpdate, UrlStore};
