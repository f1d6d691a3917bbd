//! # Squeezer Core
//!
//! Declarative reconciliation engine for the Pulp 3 REST API.
//!
//! This crate provides:
//! - A generic entity model driven by static per-kind configuration
//! - The present/absent reconciliation state machine
//! - A task monitor polling asynchronous server tasks
//! - The chunked upload protocol for large artifacts
//! - Result aggregation and reporting
//! - A transport abstraction with a route-table HTTP implementation
//!
//! ## Architecture
//!
//! A caller builds an [`Entity`] from a kind in the [`catalog`], a natural key
//! and the desired attributes, then calls [`Entity::process`] with the
//! requested state. The engine looks the entity up, decides between create,
//! update, delete and no-op, waits for any task the server spawns and records
//! the result in the [`Engine`].
//!
//! ## Key Invariants
//!
//! - Unsupported operations fail before reaching the transport
//! - Updates only happen when a desired field differs from the server
//! - Check mode never issues a state-changing call
//! - A failed chunked upload deletes its session exactly once

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod artifact;
mod cancel;
pub mod catalog;
mod config;
mod content;
mod engine;
mod entity;
mod error;
mod hooks;
pub mod http;
mod kind;
mod orphans;
mod reconciler;
mod repair;
mod result;
mod task;
mod transport;
mod upload;
pub mod workflow;

pub use artifact::{ArtifactHooks, FILE_FIELD};
pub use cancel::CancellationToken;
pub use catalog::Plugin;
pub use config::{
    EngineConfig, PollPolicy, DEFAULT_CHUNK_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL,
};
pub use content::ArtifactBackedContent;
pub use engine::Engine;
pub use entity::{diff, Entity, NaturalKey, Payload};
pub use error::{SqueezerError, SqueezerResult};
pub use hooks::{CreateFlow, KindHooks, StandardHooks};
pub use http::{HttpClient, HttpRequest, HttpResponse, HttpTransport, Method, Route, RouteTable};
pub use kind::{Capabilities, Capability, KindConfig, Lookup};
pub use orphans::delete_orphans;
pub use reconciler::{decide, reconcile, RequestedState, Transition};
pub use repair::RepairReport;
pub use result::{CollectingReporter, Failure, Outcome, Reporter, ResultAggregator};
pub use task::{ProgressReport, Task, TaskError, TaskHooks, TaskMonitor, TaskState};
pub use transport::{
    Attributes, MockTransport, Page, Parameters, RecordedCall, Response, Transport, Uploads,
};
pub use upload::{chunk_ranges, ByteRange, ChunkPlan, ChunkedUpload};
