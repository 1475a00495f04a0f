//! Slot occupancy bookkeeping.
//!
//! The host keeps one listener per slot and never reports who holds it. Every
//! install made through one [`crate::RxMap`] is recorded here as a claim, so
//! a disposing subscription can tell whether it still owns the slot.
//!
//! Listeners installed on the host directly, bypassing `RxMap`, are invisible
//! to this table.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::surface::EventKind;

/// What a disposing subscription writes to its slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum SlotRelease {
    /// Always clear the slot, even if a newer subscription displaced this one
    /// and now occupies it. The newer subscription then silently stops
    /// receiving events.
    #[default]
    Unconditional,
    /// Clear the slot only while this subscription is still its recorded
    /// occupant. A displaced subscription leaves the slot alone.
    OwnerOnly,
}

/// Ticket identifying one install into one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    kind: EventKind,
    ticket: u64,
}

impl Claim {
    /// The slot this claim was made on.
    #[must_use]
    pub const fn kind(self) -> EventKind { self.kind }
}

/// Current occupant per slot. `0` means the slot is recorded as empty.
#[derive(Debug, Default)]
pub struct SlotClaims {
    occupants: [AtomicU64; EventKind::ALL.len()],
    next_ticket: AtomicU64,
}

impl SlotClaims {
    /// Creates a table with every slot empty.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Records a new install into `kind`, displacing any previous occupant.
    pub fn claim(&self, kind: EventKind) -> Claim {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;
        let displaced = self.occupants[kind.index()].swap(ticket, Ordering::AcqRel);
        if displaced != 0 {
            tracing::debug!(%kind, displaced, ticket, "slots: occupant displaced");
        }
        Claim { kind, ticket }
    }

    /// Gives up `claim`. Returns whether the slot should be cleared on the host.
    pub fn release(&self, claim: Claim, policy: SlotRelease) -> bool {
        let occupant = &self.occupants[claim.kind.index()];
        match policy {
            SlotRelease::Unconditional => {
                let previous = occupant.swap(0, Ordering::AcqRel);
                if previous != claim.ticket && previous != 0 {
                    tracing::debug!(
                        kind = %claim.kind,
                        ticket = claim.ticket,
                        evicted = previous,
                        "slots: stale release evicted newer occupant"
                    );
                }
                true
            }
            SlotRelease::OwnerOnly => {
                let owned = occupant
                    .compare_exchange(claim.ticket, 0, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
                if !owned {
                    tracing::trace!(
                        kind = %claim.kind,
                        ticket = claim.ticket,
                        "slots: stale release skipped"
                    );
                }
                owned
            }
        }
    }

    /// Whether `claim` is still the recorded occupant of its slot.
    #[must_use]
    pub fn is_occupant(&self, claim: Claim) -> bool {
        self.occupants[claim.kind.index()].load(Ordering::Acquire) == claim.ticket
    }

    /// Whether anything is recorded in `kind`.
    #[must_use]
    pub fn is_occupied(&self, kind: EventKind) -> bool {
        self.occupants[kind.index()].load(Ordering::Acquire) != 0
    }
}
