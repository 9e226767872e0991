//! # Finality Provider Test Suite
//!
//! Cross-crate scenarios wired from real components, with only the network
//! edges replaced by in-memory doubles or local HTTP servers.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── activation.rs   # height locator over HTTP, activation recorder
//!     ├── finality.rs     # quorum verdicts through the gadget
//!     └── controller.rs   # batch submission, SDK → store-backed controller
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fp-tests
//! cargo test -p fp-tests integration::activation::
//! ```

pub mod integration;
