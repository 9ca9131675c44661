pub mod http_client;
pub mod in_memory;

pub use http_client::ReqwestFeatureService;
pub use in_memory::{InMemoryFeatureService, LayerReply};
