//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `RunState`: lifecycle of a whole run (idle, running, completed, aborted)
//! - `PageState`: how processing of an individual page ended

mod page_state;
mod run_state;

// Re-export main types
pub use page_state::PageState;
pub use run_state::RunState;
