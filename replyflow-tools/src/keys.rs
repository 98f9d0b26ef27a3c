//! Well-known shared state keys.

/// Outcome of the latest-unread fetch ([`crate::mail::FetchResult`]).
pub const FETCHED_EMAIL_DATA: &str = "fetched_email_data";

/// Reply text produced by the drafting step.
pub const DRAFTED_REPLY: &str = "drafted_reply";
