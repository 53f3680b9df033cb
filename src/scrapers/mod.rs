//! Scrapers for the two sources of missing-person records.
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | Missing-persons site | [`atfal`] | Paginated HTML listing + detail pages |
//! | Photo album | [`album`] | Post pages captured to disk |
//!
//! Both process records one at a time with a configurable pause, log and
//! skip pages they cannot parse, and reuse the streaming image writer in
//! [`crate::outputs::images`].

pub mod album;
pub mod atfal;
