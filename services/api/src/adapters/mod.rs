pub mod backend;
pub mod db;
pub mod memory;

pub use backend::HttpBackendAdapter;
pub use db::DbAdapter;
pub use memory::InMemorySessionStore;
