pub mod environment;
pub mod ids;
pub mod matcher;
pub mod result;
pub mod scenario;

pub use environment::*;
pub use ids::CampaignId;
pub use matcher::{Matcher, MatcherError, Pattern};
pub use result::*;
pub use scenario::*;

/// Maximum length for user-supplied regex patterns to prevent `ReDoS` attacks.
pub const MAX_REGEX_PATTERN_LEN: usize = 1000;

/// Default working root inside an environment.
pub const DEFAULT_WORK_ROOT: &str = "/test";
