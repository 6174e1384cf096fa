//! Request/response model shared by the cache manager and its network transport.

mod fetcher;
mod request;
mod response;

pub use fetcher::{Fetcher, HttpFetcher};
pub use request::{Destination, Request, RequestKey, RequestMode};
pub use response::ResponseSnapshot;
