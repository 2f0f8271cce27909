//! Shared constants for end-to-end tests

/// Schema version that moves aliases to their own table and disambiguates performers.
pub const NORMALIZATION_VERSION: usize = 2;

/// Small enough to push every fixture across several pages.
pub const SMALL_BATCH_SIZE: usize = 2;

pub const JANE_ALIASES: &str = "Jane Doe, J. Doe / JD";
