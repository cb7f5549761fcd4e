//! Simulated guest for the ASLR smoke test.
//!
//! Stands in for a VM runner: "boots" an image by randomizing a fixed set of
//! region bases and prints the console output a real guest would, ending in
//! an `ADDRESS_LIST:` report.

pub mod kaslr;
pub mod layout;

pub use kaslr::{Entropy, FixedEntropy, Kaslr, SystemEntropy};
pub use layout::{GuestLayout, Region, ADDRESS_LIST_MARKER, GUEST_VERSION, REGIONS};
