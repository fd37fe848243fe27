//! Policy persistence and concurrency control

mod policy_store;
mod storage;

pub use policy_store::{LockedPolicy, PolicyStore};
pub use storage::{InMemoryStorage, Storage};
