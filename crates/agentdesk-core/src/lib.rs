//! Domain layer of the agentdesk development server.
//!
//! Everything here is transport-agnostic: resource types and their store
//! traits ([`entities`]), the in-memory [`MemoryStore`] that implements
//! them, list pagination, the simulated chat responder and its SSE
//! framing. The HTTP surface lives in the `agentdesk-server` binary.

pub mod chat;
pub mod entities;
pub mod error;
pub mod ids;
pub mod pagination;
pub mod store;
pub mod stream;
pub mod tasks;

pub use error::{CoreError, CoreResult};
pub use pagination::{Page, PageQuery};
pub use store::{MemoryStore, StoreSettings};
