//! KASLR entropy and page randomization.
//!
//! The boot seed is a rotate-xor hash over the guest version string. Each
//! draw mixes the seed with a hardware random word (when available) and a
//! timestamp counter, then diffuses the bits with a 64x64->128 multiply
//! whose high half is folded back into the low half.

use std::time::{SystemTime, UNIX_EPOCH};

/// Multiplier for the circular multiply.
pub const MIX_CONST: u64 = 0x5d60_08cb_f384_8dd3;

/// Standard page size (4 KiB).
pub const PAGE_SIZE: u64 = 4096;

pub const PAGE_SHIFT: u32 = 12;

/// Timestamp advance between draws of [`FixedEntropy`].
const FIXED_TSC_STEP: u64 = 0x1_0000;

/// Hash `area` into `hash`, one little-endian word at a time.
///
/// A trailing partial word is ignored.
pub fn rotate_xor(mut hash: u64, area: &[u8]) -> u64 {
    for chunk in area.chunks_exact(8) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        // Rotate by an odd number of bits, then xor.
        hash = hash.rotate_right(7);
        hash ^= u64::from_le_bytes(word);
    }
    hash
}

/// Starting entropy derived from the version string.
pub fn boot_seed(version: &str) -> u64 {
    rotate_xor(0, version.as_bytes())
}

/// Combine the seed with a hardware word and a timestamp.
pub fn mix(seed: u64, hardware: Option<u64>, tsc: u64) -> u64 {
    let random = seed ^ hardware.unwrap_or(0) ^ tsc;
    let product = u128::from(random) * u128::from(MIX_CONST);
    let low = product as u64;
    let high = (product >> 64) as u64;
    low.wrapping_add(high)
}

#[inline]
pub fn is_page_aligned(addr: u64) -> bool {
    addr & (PAGE_SIZE - 1) == 0
}

/// Pick a page-aligned address in `[start, start + range)` using `random`.
///
/// An unaligned `start` is rounded up and the range shrunk to match; the
/// range is clamped so the window never wraps. A window that holds no whole
/// page returns the caller's `start` unchanged.
pub fn randomize_page(start: u64, range: u64, random: u64) -> u64 {
    let requested = start;
    let (mut start, mut range) = (start, range);
    if !is_page_aligned(start) {
        let Some(aligned) = start
            .checked_add(PAGE_SIZE - 1)
            .map(|a| a & !(PAGE_SIZE - 1))
        else {
            return requested;
        };
        range = range.saturating_sub(aligned - start);
        start = aligned;
    }

    if start > u64::MAX - range {
        range = u64::MAX - start;
    }

    let pages = range >> PAGE_SHIFT;
    if pages == 0 {
        return requested;
    }

    start + ((random % pages) << PAGE_SHIFT)
}

/// Source of raw entropy for a boot.
pub trait Entropy {
    /// A hardware random word, if the platform has one.
    fn hardware_random(&mut self) -> Option<u64>;

    /// Current timestamp counter.
    fn timestamp(&mut self) -> u64;
}

/// Entropy from the host: `rand` for the hardware word, the wall clock for
/// the timestamp.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEntropy;

impl Entropy for SystemEntropy {
    fn hardware_random(&mut self) -> Option<u64> {
        Some(rand::random())
    }

    fn timestamp(&mut self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

/// Reproducible entropy: no hardware word and a counter that advances by a
/// fixed step from `seed`. Two boots with the same seed get the same layout.
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy {
    tsc: u64,
}

impl FixedEntropy {
    pub fn new(seed: u64) -> Self {
        Self { tsc: seed }
    }
}

impl Entropy for FixedEntropy {
    fn hardware_random(&mut self) -> Option<u64> {
        None
    }

    fn timestamp(&mut self) -> u64 {
        let now = self.tsc;
        self.tsc = self.tsc.wrapping_add(FIXED_TSC_STEP);
        now
    }
}

/// Random number generator for one guest boot.
pub struct Kaslr<E> {
    seed: u64,
    entropy: E,
}

impl<E: Entropy> Kaslr<E> {
    pub fn new(version: &str, entropy: E) -> Self {
        Self {
            seed: boot_seed(version),
            entropy,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn random_long(&mut self) -> u64 {
        let hardware = self.entropy.hardware_random();
        let tsc = self.entropy.timestamp();
        mix(self.seed, hardware, tsc)
    }

    /// [`randomize_page`] with a fresh random word.
    pub fn randomize_page(&mut self, start: u64, range: u64) -> u64 {
        let random = self.random_long();
        randomize_page(start, range, random)
    }
}
