pub mod analysis;
pub mod config;
pub mod forum;
pub mod session;

pub use analysis::Analysis;
pub use config::{CompanionConfig, Config, RedditCredentials};
pub use forum::{SortOrder, Thread, TimeWindow};
pub use session::ThreadSessionEntry;
