pub mod cart_repository;
pub mod key_value_store;


pub use cart_repository::{CartStorage, KeyValueCartRepository, DEFAULT_CART_KEY};
pub use key_value_store::{FileStore, InMemoryStore, KeyValueStore};
