pub mod engine;
pub mod notifier;
pub mod predicate;
pub mod query;
pub mod schedule_match;
pub mod stats;
