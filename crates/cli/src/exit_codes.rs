//! Exit code registry for `outage-sync`.
//!
//! The scheduler only distinguishes zero from non-zero, but the codes
//! below make the failing phase visible in task-history logs.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Run completed (store-level failures are logged, not fatal) |
//! | 1    | General error                                             |
//! | 60   | No published URL found for a time-bucketed provider       |
//! | 61   | A provider payload could not be fetched or parsed         |
//! | 62   | Configuration file unreadable or invalid                  |

/// Success - run completed.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// URL resolution exhausted every time-bucket candidate.
pub const EXIT_URL_NOT_FOUND: u8 = 60;

/// Payload fetch or parse failed (likely an upstream schema change).
pub const EXIT_SCRAPE: u8 = 61;

/// Config file could not be read, parsed or validated.
pub const EXIT_CONFIG: u8 = 62;
