pub mod core;
pub mod llm;
pub mod memory;
pub mod pipeline;
pub mod rag;
pub mod search;
pub mod server;
pub mod state;
pub mod vector_math;
