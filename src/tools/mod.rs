//! Tool system for function calling.

pub mod arguments;
pub mod invoker;
pub mod provider;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use invoker::ToolInvoker;
pub use provider::{
    qualified_name, ProvidedTool, ProviderToolAdapter, ToolProvider, ToolSet,
    FUNCTION_NAME_DELIMITER,
};
pub use tool::{FunctionTool, Tool, ToolExecutionContext};
pub use types::{ParameterBuilder, ToolParameters};
