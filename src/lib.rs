//! # converge-engine
//!
//! Node-local convergence engine. A host declares *units* (a typed, named
//! piece of desired state with actions and properties), registers *handlers*
//! that know how to converge each unit type on a given platform, and hands
//! the batch to a [ConvergenceEngine].
//!
//! ## Architecture
//!
//! - [registry] keeps handler registrations ordered by how specific their
//!   node filters are ([filter]); [resolver] turns a unit and the node's
//!   [NodeFacts] into a runnable [Handler].
//! - [engine] runs the batch in order, delivers immediate notifications
//!   recursively and delayed ones after the batch, and applies retry and
//!   ignore-failure policy.
//! - Every step is published as an [Event]; the [tracker] consumes the
//!   stream and produces a [RunReport].
//!
//! ```no_run
//! use converge_engine::{
//!   ConvergenceEngine, EngineConfig, HandlerCatalog, HandlerRegistry, HandlerResolver, NodeFacts,
//!   Unit, UnitCollection, register_builtins,
//! };
//!
//! let mut registry = HandlerRegistry::new();
//! let mut catalog = HandlerCatalog::new();
//! register_builtins(&mut registry, &mut catalog);
//! registry.lock();
//!
//! let facts = NodeFacts::new().with("os", "linux");
//! let mut units = UnitCollection::new().with(
//!   Unit::builder("execute", "echo hello").action("run").build().unwrap(),
//! );
//! let mut engine = ConvergenceEngine::new(
//!   HandlerResolver::new(&registry, &catalog),
//!   &facts,
//!   EngineConfig::from_env(),
//! );
//! let outcome = engine.converge(&mut units);
//! let report = engine.report(&outcome);
//! println!("{}", serde_json::to_string_pretty(&report).unwrap());
//! ```

pub mod builtin;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod handler;
pub mod registry;
pub mod resolver;
pub(crate) mod shell;
pub mod tracker;
pub mod types;

pub use builtin::register_builtins;
pub use config::EngineConfig;
pub use engine::{ActionContext, ConvergenceEngine, UnitCollection};
pub use error::{ActionError, ConvergeError, ResolutionError};
pub use events::{Event, EventSink, TracingSink};
pub use filter::{FilterSet, Requirement, Version};
pub use handler::{Handler, HandlerCatalog, HandlerId};
pub use registry::{HandlerRegistry, LegacyPlatformMap, Provides};
pub use resolver::HandlerResolver;
pub use tracker::{OutcomeTracker, RunReport};
pub use types::{NodeFacts, Properties, Timing, Unit, UnitRef};
