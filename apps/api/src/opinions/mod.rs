// Student opinion generation.
// Pipeline: catalog → resolver → prompts → generation → parser, driven by service.
// All provider calls go through llm_client.

pub mod catalog;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod resolver;
pub mod service;
