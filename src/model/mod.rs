pub mod category;
pub mod config;
pub mod dataset;
pub mod event;
pub mod filter;
pub mod record;
pub mod schedule;
pub mod tracker;

pub use category::*;
pub use config::*;
pub use dataset::*;
pub use event::*;
pub use filter::*;
pub use record::*;
pub use schedule::*;
pub use tracker::*;
