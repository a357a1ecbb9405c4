mod heuristic;
mod http;
mod remote;
mod traits;

pub use heuristic::HeuristicExtractor;
pub use http::HttpClient;
pub use remote::{GeminiService, RemoteConfig, RemoteExtractor};
pub use traits::{InferenceService, ListingExtractor, ListingPage, MediaExtractor};
