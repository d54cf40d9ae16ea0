//! Portal input data (spec §3).

use serde::{Deserialize, Serialize};

/// An input portal. Immutable after ingest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub name: String,
    /// Degrees.
    pub lon: f64,
    /// Degrees.
    pub lat: f64,
    pub keys: u32,
    pub sbul: bool,
    /// Recognised but unenforced, per spec Open Question (Design Notes §9).
    pub inbound: bool,
}

impl Portal {
    pub fn new(name: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self { name: name.into(), lon, lat, keys: 0, sbul: false, inbound: false }
    }

    /// Outgoing-link cap for this portal (spec §3 invariant).
    pub fn outgoing_cap(&self) -> usize {
        if self.sbul { 40 } else { 8 }
    }
}

/// Derived (x, y) pair for a portal: gnomonic for planar geometry,
/// web-mercator for external rendering. Immutable once computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectedPortal {
    pub gnomonic: (f64, f64),
    pub mercator: (f64, f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_cap_respects_sbul() {
        let mut p = Portal::new("a", 0.0, 0.0);
        assert_eq!(p.outgoing_cap(), 8);
        p.sbul = true;
        assert_eq!(p.outgoing_cap(), 40);
    }
}
