//! Blockflow - function-to-block adapter for node-based workflows
//!
//! Wraps plain compute functions as executable blocks with named ports and
//! UI options:
//! 1. A `FunctionDescriptor` plus an optional `BlockConfig` produce a
//!    declarative `BlockSchema` (ports, outputs, option controls)
//! 2. `Block::execute` resolves live values through a `PortProvider`,
//!    optionally memoizes results in a content-addressed `CacheStore`,
//!    times the call and publishes one value per declared output
//! 3. A `Modifier` can rewrap the compute function per invocation; the
//!    bundled `CombinationModifier` fans a function out over data sources
//!    and parameter grids via the blockflow-combine engine
//!
//! Execution is single-threaded and synchronous; a block's compute call
//! blocks the caller until it returns.

pub mod block;
pub mod builder;
pub mod builtin;
pub mod cache;
pub mod context;
pub mod errors;
pub mod modifier;
pub mod ports;
pub mod registry;

pub use block::{Block, ExecutionRecord, Outcome};
pub use builder::{BlockBuilder, CACHE_OPTION_LABEL};
pub use cache::CacheStore;
pub use context::ExecutionContext;
pub use errors::{FlowError, Result};
pub use modifier::{CombinationModifier, Modifier};
pub use ports::{MemoryPorts, PortProvider};
pub use registry::BlockRegistry;

// Re-export the shared type system for hosts that only depend on this crate
pub use blockflow_schema::{
    ArgMap, Args, BlockConfig, BlockSchema, ComputeFn, ControlType, FunctionDescriptor,
    InputPort, OptionConfig, OptionSpec, Outputs, ParamSpec, PortLabels, SchemaError, Value,
    ValueType,
};
