//! Blockflow schema types
//!
//! This crate holds the shared type system for the blockflow workflow engine:
//! - Block schemas: named input/output ports and UI option controls
//! - Function descriptors: explicit, statically-declared parameter and
//!   output-arity information for adapted compute functions
//! - Declarative block configuration, loadable from JSON files
//! - The shared execution types (`Args`, `Outputs`, `ComputeFn`) used by the
//!   adapter and the combination engine

pub mod config;
pub mod descriptor;
pub mod errors;
pub mod exec;
pub mod types;

pub use config::{BlockConfig, OptionConfig};
pub use descriptor::{FunctionDescriptor, ParamSpec};
pub use errors::SchemaError;
pub use exec::{Args, ComputeFn, Outputs};
pub use types::{
    ArgMap, BlockSchema, ControlType, InputPort, OptionSpec, PortLabels, Value, ValueType,
};
