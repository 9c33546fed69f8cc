//! Client side of keepsake.
//!
//! This crate provides the network fetch primitive, request routing, the
//! fetch strategies, the worker lifecycle and the control channel, wired
//! together by [`CacheEngine`].

pub mod control;
pub mod engine;
pub mod fetch;
pub mod lifecycle;
pub mod routing;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use control::{ControlMessage, ControlReply};
pub use engine::{CacheEngine, StartReport};
pub use fetch::{
    Destination, FetchConfig, FetchResponse, Fetcher, HttpFetcher, Method, NetworkError, Request, RequestMode,
};
pub use lifecycle::{ActivationReport, InstallReport, WorkerState};
pub use routing::{CacheNamer, Route, StrategySelector};
pub use strategy::{Background, FetchOutcome, PrecacheFailure, PrecacheReport, ResponseSource};
