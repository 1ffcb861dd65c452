//! Vector Store Proxy (C16), its Milvus- and Elasticsearch-equivalent
//! backends, and the ephemeral-collection reaper (C17).

mod backend;
mod elasticsearch_equiv;
mod ephemeral;
mod milvus_equiv;
mod proxy;
mod types;

pub use backend::VectorStoreBackend;
pub use elasticsearch_equiv::ElasticsearchEquivalentBackend;
pub use ephemeral::{EphemeralRegistry, Reaper};
pub use milvus_equiv::MilvusEquivalentBackend;
pub use proxy::{SearchFilters, VectorStoreProxy};
pub use types::{SearchResult, VectorItem};
