pub mod adapter;
pub mod domain;
pub mod file;
pub mod file_manager;
pub mod store;
pub mod traits;
