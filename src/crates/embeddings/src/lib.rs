//! # embeddings - Provider and Store Abstractions
//!
//! Contracts the toolbridge match engine needs from the outside world:
//! an [`EmbeddingProvider`] that maps text to a fixed-length vector, and a
//! [`VectorStore`] that answers nearest-neighbor queries over stored
//! vectors. Both are traits so backends can be swapped; reference
//! implementations are an OpenAI-compatible HTTP client and a brute-force
//! in-memory store.

pub mod error;
pub mod provider;
pub mod store;

pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingConfig, EmbeddingProvider, OpenAiEmbeddings};
pub use store::{InMemoryVectorStore, VectorMatch, VectorStore};
