pub mod analysis;
pub mod cache;
pub mod companion;
pub mod llm;
pub mod publisher;
pub mod rebuttal;
pub mod session;
pub mod summarizer;

pub use companion::CompanionService;
