pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;
