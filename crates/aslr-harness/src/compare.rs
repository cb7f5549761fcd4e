//! Divergence comparison between two address reports.
//!
//! The comparison is driven by the first report's keys. A key the second
//! report lacks cannot be looked up and is a protocol error; keys only the
//! second report carries are recorded but never compared.
//!
//! Randomization can place a region at the same address twice by chance, so
//! a collision here is occasionally a false failure. That is accepted.

use serde::Serialize;
use tracing::warn;

use crate::error::HarnessError;
use crate::report::AddressReport;

/// Addresses reported for one key in the two runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyDivergence {
    pub key: String,
    pub first: u64,
    pub second: u64,
}

impl KeyDivergence {
    pub fn collides(&self) -> bool {
        self.first == self.second
    }

    /// Number of address bits that changed between the runs.
    pub fn differing_bits(&self) -> u32 {
        (self.first ^ self.second).count_ones()
    }
}

/// Outcome of comparing two reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DivergenceReport {
    pub entries: Vec<KeyDivergence>,
    /// Keys present only in the second report.
    pub unmatched: Vec<String>,
}

impl DivergenceReport {
    /// Entries whose two addresses are equal.
    pub fn collisions(&self) -> Vec<&KeyDivergence> {
        self.entries.iter().filter(|e| e.collides()).collect()
    }

    pub fn is_divergent(&self) -> bool {
        self.entries.iter().all(|e| !e.collides())
    }

    /// Fail with [`HarnessError::AddressCollision`] if any key collided.
    pub fn check(&self) -> Result<(), HarnessError> {
        let keys: Vec<String> = self.collisions().iter().map(|e| e.key.clone()).collect();
        if keys.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::AddressCollision { keys })
        }
    }

    /// Assert that every compared key moved between the runs.
    ///
    /// Panics with the colliding keys and addresses otherwise, so a test
    /// reports a failed expectation rather than an error.
    pub fn assert_divergent(&self) {
        let collisions = self.collisions();
        assert!(
            collisions.is_empty(),
            "address unchanged between runs: {}",
            collisions
                .iter()
                .map(|e| format!("{} = {:#x}", e.key, e.first))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

/// Compare `first` against `second`, key by key.
pub fn compare_reports(
    first: &AddressReport,
    second: &AddressReport,
) -> Result<DivergenceReport, HarnessError> {
    let mut entries = Vec::with_capacity(first.len());
    for (key, addr1) in first.iter() {
        let addr2 = second.get(key).ok_or_else(|| HarnessError::MissingKey {
            key: key.to_string(),
        })?;
        entries.push(KeyDivergence {
            key: key.to_string(),
            first: addr1,
            second: addr2,
        });
    }

    let unmatched: Vec<String> = second
        .keys()
        .filter(|key| !first.contains_key(key))
        .map(str::to_string)
        .collect();
    if !unmatched.is_empty() {
        warn!(keys = ?unmatched, "second report has keys the first lacks; not compared");
    }

    Ok(DivergenceReport { entries, unmatched })
}
