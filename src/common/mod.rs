pub mod cancel;
pub mod http;
pub mod logger;
pub mod retry;
pub mod types;

pub use cancel::CancelToken;
pub use http::HttpClient;
pub use types::{HeaderMap, ProgressCallback};
