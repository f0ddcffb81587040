//! # toolbridge-spec - Specification Compiler
//!
//! Turns an OpenAPI 3.x or Swagger 2.0 document into a flat set of
//! [`ToolDescriptor`] records that the rest of the toolbridge pipeline can
//! match against and execute.
//!
//! The compiler is deliberately forgiving: one malformed operation never
//! aborts a compile, and unresolvable `$ref` pointers degrade to empty
//! schemas instead of errors. Real-world specifications are messy and a
//! partially usable tool set beats none.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use toolbridge_spec::SpecCompiler;
//!
//! let tools = SpecCompiler::from_json_str(&std::fs::read_to_string("petstore.json")?)?;
//! for tool in &tools {
//!     println!("{} {} -> {}", tool.endpoint.method, tool.endpoint.path, tool.name);
//! }
//! ```

pub mod compiler;
pub mod descriptor;
pub mod error;
pub mod resolver;

pub use compiler::SpecCompiler;
pub use descriptor::{
    Endpoint, FieldSchema, HttpMethod, InputSchema, SecurityRequirement, ToolAnnotations,
    ToolDescriptor,
};
pub use error::{Result, SpecError};
pub use resolver::{resolve_schema, MAX_RESOLVE_DEPTH};
