//! Request routing: which partition a request lives in and which strategy
//! serves it.

pub mod namer;
pub mod selector;

pub use namer::{CacheNamer, classify, resource_class};
pub use selector::{BypassReason, Route, StrategySelector};
