//! Testing infrastructure for fest.
//!
//! - **Mocks**: [`MockFileStat`] stands in for real modification times
//! - **Fixtures**: temporary festival trees (test-only)
//!
//! # Example
//!
//! ```rust,ignore
//! use fest::testing::{FestivalFixture, MockFileStat};
//!
//! let fixture = FestivalFixture::sample();
//! let stat = MockFileStat::new().with_mtime(fixture.path("001_PLAN/01_design/01_design.md"), now);
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod mocks;

#[cfg(test)]
pub use fixtures::*;
pub use mocks::*;
