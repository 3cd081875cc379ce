pub mod config_io;
pub mod data_io;
pub mod lock;
pub mod state;
pub mod store;
pub mod watcher;
