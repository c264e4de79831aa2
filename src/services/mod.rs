pub mod batch_export;
pub mod batch_orchestrator;
pub mod cache;
pub mod lead_source;
pub mod places_client;
pub mod proxy_pool;
pub mod result_parser;
pub mod search_executor;
pub mod source_fetcher;

pub use batch_export::*;
pub use batch_orchestrator::*;
pub use cache::*;
pub use lead_source::*;
pub use places_client::*;
pub use proxy_pool::*;
pub use result_parser::*;
pub use search_executor::*;
pub use source_fetcher::*;
