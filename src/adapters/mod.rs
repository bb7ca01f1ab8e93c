//! Framework-facing wrappers around [`crate::UnizoToolSet`].

pub mod crewai;
pub mod langchain;
pub mod openai;

pub use crewai::{CrewTool, UnizoCrewAIToolSet};
pub use langchain::{StructuredTool, UnizoLangChainToolSet};
pub use openai::{openai_tool, UnizoOpenAIToolSet};
