//! # Topic Relay Test Suite
//!
//! Cross-crate scenarios exercising the dispatcher together with the
//! in-memory store, the delivery bus and telemetry setup.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs       # Shared executor and sink doubles
//!     ├── scenarios.rs     # Subscribe / trigger / unsubscribe behaviour
//!     ├── bus_delivery.rs  # Dispatcher -> delivery bus -> channel handles
//!     └── concurrency.rs   # Racing subscribers, triggers and deletes
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p relay-tests
//! cargo test -p relay-tests integration::scenarios::
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]
