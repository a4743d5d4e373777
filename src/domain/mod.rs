pub mod error;
pub mod id;
pub mod money;
pub mod order;
pub mod store;
