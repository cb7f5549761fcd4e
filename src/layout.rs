//! Simulated guest address-space layout.
//!
//! One base address per region the guest probe reports: anonymous mmap,
//! 32-bit mmap, main and thread stacks, small and large heap allocations,
//! the main program and the kernel text.

use std::collections::BTreeMap;

use crate::kaslr::{Entropy, Kaslr};

/// Marker printed right before the address report.
pub const ADDRESS_LIST_MARKER: &str = "ADDRESS_LIST:";

/// Version string hashed into the boot seed.
pub const GUEST_VERSION: &str = concat!("aslr-smoke sim-guest v", env!("CARGO_PKG_VERSION"));

/// A randomization window.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub name: &'static str,
    pub start: u64,
    pub range: u64,
}

// ============================================================================
// Region windows
// ============================================================================

pub const REGIONS: &[Region] = &[
    Region {
        name: "mmap",
        start: 0x2000_0000_0000,
        range: 0x1000_0000_0000,
    },
    // MAP_32BIT mappings stay below 4 GiB.
    Region {
        name: "mmap_32bit",
        start: 0x4000_0000,
        range: 0xbfff_0000,
    },
    Region {
        name: "main_stack",
        start: 0x7f00_0000_0000,
        range: 0x00ff_0000_0000,
    },
    Region {
        name: "thread_stack",
        start: 0x6000_0000_0000,
        range: 0x1000_0000_0000,
    },
    Region {
        name: "small_heap",
        start: 0xffff_8000_0000_0000,
        range: 0x0000_1000_0000_0000,
    },
    Region {
        name: "large_heap",
        start: 0x3000_0000_0000,
        range: 0x1000_0000_0000,
    },
    Region {
        name: "main_program",
        start: 0x1000_0000_0000,
        range: 0x1000_0000_0000,
    },
    // 1 GiB window for kernel text.
    Region {
        name: "kernel_base",
        start: 0xffff_ffff_8000_0000,
        range: 0x4000_0000,
    },
];

/// Base addresses picked for one boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestLayout {
    bases: BTreeMap<&'static str, u64>,
}

impl GuestLayout {
    /// Randomize every region in [`REGIONS`].
    pub fn boot<E: Entropy>(kaslr: &mut Kaslr<E>) -> Self {
        let bases = REGIONS
            .iter()
            .map(|region| (region.name, kaslr.randomize_page(region.start, region.range)))
            .collect();
        Self { bases }
    }

    pub fn base(&self, name: &str) -> Option<u64> {
        self.bases.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.bases.iter().map(|(name, addr)| (*name, *addr))
    }

    /// The report object: region name to `0x`-prefixed hex string.
    pub fn report_json(&self) -> serde_json::Result<String> {
        let report: BTreeMap<&str, String> = self
            .bases
            .iter()
            .map(|(name, addr)| (*name, format!("{:#x}", addr)))
            .collect();
        serde_json::to_string(&report)
    }

    /// Everything the guest prints on its console for one boot.
    pub fn console_output(&self, image: &str, seed: u64) -> serde_json::Result<String> {
        let mut out = String::new();
        out.push_str(GUEST_VERSION);
        out.push('\n');
        out.push_str(&format!("kaslr: boot seed {:#018x}\n", seed));
        out.push_str(&format!("Booting {}\n", image));
        for (name, addr) in self.iter() {
            out.push_str(&format!("{} address : {:#x}\n", name, addr));
        }
        out.push_str(&format!("{}{}\n", ADDRESS_LIST_MARKER, self.report_json()?));
        Ok(out)
    }
}
