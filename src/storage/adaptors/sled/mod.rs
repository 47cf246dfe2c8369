mod sled_storage_engine;

pub use sled_storage_engine::*;
