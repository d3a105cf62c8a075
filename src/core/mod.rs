pub mod error;
pub mod identity;
pub mod store;

pub use error::{AiError, Result, StorageError, ValidationError};
pub use identity::{AnonymousIdentity, IdentityProvider, User};
pub use store::{FileStore, KeyValueStore, MemoryStore};
