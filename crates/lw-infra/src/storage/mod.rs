//! Key/value storage backends implementing the localStorage contract.

mod file;
mod in_memory;

pub use file::FileKeyValueStorage;
pub use in_memory::InMemoryKeyValueStorage;
