//! Lazy retrieval of optional per-record metadata.
//!
//! Fields are first queried at the cheapest tier known to work for their kind.
//! When a tier reports the field as absent the query moves one tier up and
//! that tier becomes the new floor for the kind. Files are assumed internally
//! homogeneous, so a floor never moves back down; after the first few records
//! every query costs one read.

use log::debug;

use crate::source::DetailTier;

/// Metadata field kinds with an independent tier floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// MS level
    Level,
    /// Scan start time
    StartTime,
    /// Ion mobility value
    Mobility,
    /// Scan description
    ScanDescription,
    /// Precursor list
    Precursors,
}

impl FieldKind {
    /// Every field kind.
    pub const ALL: [FieldKind; 5] = [
        FieldKind::Level,
        FieldKind::StartTime,
        FieldKind::Mobility,
        FieldKind::ScanDescription,
        FieldKind::Precursors,
    ];

    fn slot(self) -> usize {
        match self {
            FieldKind::Level => 0,
            FieldKind::StartTime => 1,
            FieldKind::Mobility => 2,
            FieldKind::ScanDescription => 3,
            FieldKind::Precursors => 4,
        }
    }
}

/// Remembers the cheapest useful tier per field kind.
#[derive(Debug, Clone, Default)]
pub struct EscalationResolver {
    floors: [DetailTier; 5],
    probes: u64,
}

impl EscalationResolver {
    /// Resolver with every floor at [`DetailTier::Instant`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current floor for a field kind.
    pub fn floor(&self, kind: FieldKind) -> DetailTier {
        self.floors[kind.slot()]
    }

    /// Reads issued through this resolver so far.
    pub fn probe_count(&self) -> u64 {
        self.probes
    }

    /// Resolve one field value.
    ///
    /// `read` queries the field at a tier; `is_usable` tells a present value
    /// from a sentinel absence. The value read at [`DetailTier::MAX_METADATA`]
    /// is returned as is, usable or not. Errors from `read` are returned
    /// immediately and never trigger escalation.
    pub fn resolve<T, E, R, U>(&mut self, kind: FieldKind, mut read: R, is_usable: U) -> Result<T, E>
    where
        R: FnMut(DetailTier) -> Result<T, E>,
        U: Fn(&T) -> bool,
    {
        let mut tier = self.floor(kind);
        loop {
            let value = read(tier)?;
            self.probes += 1;

            if is_usable(&value) || tier >= DetailTier::MAX_METADATA {
                return Ok(value);
            }

            let next = match tier.next() {
                Some(next) => next,
                None => return Ok(value),
            };
            debug!("{:?} absent at {} tier, escalating to {}", kind, tier, next);
            self.raise(kind, next);
            tier = next;
        }
    }

    fn raise(&mut self, kind: FieldKind, tier: DetailTier) {
        let floor = &mut self.floors[kind.slot()];
        if tier > *floor {
            *floor = tier;
        }
    }
}
