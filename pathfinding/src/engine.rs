//! Probe and recursion rules.

use std::time::Instant;

use ripple_types::{PaymentDirection, PaymentId, PeerAccount};

use crate::{AccountPathTable, Path};

/// A `FindPathOut` / `FindPathIn` probe as seen by the receiving account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Probe {
    pub id: PaymentId,
    pub amount: u32,
    pub source: PeerAccount,
    pub direction: PaymentDirection,
}

/// A probe to send to one neighbour along a resolved route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announcement {
    pub to: PeerAccount,
    pub direction: PaymentDirection,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The probe's search reached this node for the first time. Answer the
    /// source with a depth-0 recursion.
    Joined,
    /// The probe completed the route through this node. Pass the route on
    /// to each neighbour so the roots that have not seen it yet resolve.
    Resolved { announce: Vec<Announcement> },
    /// The search already passed through here; send the probe on to every
    /// relation with capacity except `exclude`.
    Forward { exclude: Vec<PeerAccount> },
    Ignored(IgnoreReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The route through this node is already known.
    Committed,
    /// A root's own search came back around a cycle.
    OwnSearch,
    /// Same identifier, different amount.
    AmountMismatch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecurseOutcome {
    /// The recursion reached an unresolved root: flood the next wave.
    Reflood {
        amount: u32,
        direction: PaymentDirection,
    },
    /// Pass the recursion on towards the root.
    Forward { to: PeerAccount, depth: u32 },
    /// The route through this node is complete.
    Settled,
    Rejected(RecurseRejection),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecurseRejection {
    UnknownPath,
    DepthMismatch { expected: u32, received: u32 },
    NoUpstream,
}

/// Probes announcing `path` to both of its neighbours: an outgoing probe
/// towards the payee side, an incoming probe towards the payer side.
fn announcements(path: &Path) -> Vec<Announcement> {
    let mut announce = Vec::with_capacity(2);
    if let Some(to) = &path.outgoing {
        announce.push(Announcement {
            to: to.clone(),
            direction: PaymentDirection::Outgoing,
        });
    }
    if let Some(to) = &path.incoming {
        announce.push(Announcement {
            to: to.clone(),
            direction: PaymentDirection::Incoming,
        });
    }
    announce
}

impl AccountPathTable {
    /// Decide what `probe` does to this table without changing it.
    pub fn plan_probe(&self, probe: &Probe) -> ProbeOutcome {
        let root_direction = self
            .payment
            .as_ref()
            .filter(|p| p.id == probe.id)
            .map(|p| p.direction);

        let Some(path) = self.paths.get(&probe.id) else {
            return ProbeOutcome::Joined;
        };
        if path.amount != probe.amount {
            return ProbeOutcome::Ignored(IgnoreReason::AmountMismatch);
        }
        if path.committed {
            return ProbeOutcome::Ignored(IgnoreReason::Committed);
        }

        if let Some(own_direction) = root_direction {
            if own_direction == probe.direction {
                return ProbeOutcome::Ignored(IgnoreReason::OwnSearch);
            }
            let mut resolved = path.clone();
            resolved.set_slot(probe.direction, probe.source.clone());
            return ProbeOutcome::Resolved {
                announce: announcements(&resolved),
            };
        }

        match path.slot(probe.direction) {
            None => {
                let mut bridged = path.clone();
                bridged.set_slot(probe.direction, probe.source.clone());
                if bridged.is_bridged() {
                    ProbeOutcome::Resolved {
                        announce: announcements(&bridged),
                    }
                } else {
                    ProbeOutcome::Joined
                }
            }
            Some(upstream) => {
                let mut exclude = vec![probe.source.clone()];
                if !exclude.contains(upstream) {
                    exclude.push(upstream.clone());
                }
                ProbeOutcome::Forward { exclude }
            }
        }
    }

    /// Record the effect of a planned probe.
    pub fn apply_probe(&mut self, probe: Probe, outcome: &ProbeOutcome, now: Instant) {
        self.refresh(now);
        let expires_at = now + self.timeout;
        match outcome {
            ProbeOutcome::Joined | ProbeOutcome::Resolved { .. } => {
                let path = self
                    .paths
                    .entry(probe.id)
                    .or_insert_with(|| Path::new(probe.id, probe.amount, expires_at));
                path.set_slot(probe.direction, probe.source);
                path.expires_at = path.expires_at.max(expires_at);
                if matches!(outcome, ProbeOutcome::Resolved { .. }) {
                    path.committed = true;
                    tracing::debug!(payment = %probe.id, "route resolved");
                }
            }
            ProbeOutcome::Forward { .. } | ProbeOutcome::Ignored(IgnoreReason::Committed) => {
                if let Some(path) = self.paths.get_mut(&probe.id) {
                    path.expires_at = path.expires_at.max(expires_at);
                }
            }
            ProbeOutcome::Ignored(_) => {}
        }
    }

    #[cfg(test)]
    fn on_probe(&mut self, probe: Probe, now: Instant) -> ProbeOutcome {
        let outcome = self.plan_probe(&probe);
        self.apply_probe(probe, &outcome, now);
        outcome
    }

    /// Decide what a recursion at `depth` does to this table without
    /// changing it.
    pub fn plan_recurse(&self, id: PaymentId, depth: u32) -> RecurseOutcome {
        let root = self.payment.as_ref().filter(|p| p.id == id).map(|p| p.direction);

        let Some(path) = self.paths.get(&id) else {
            return RecurseOutcome::Rejected(RecurseRejection::UnknownPath);
        };
        if depth != path.depth {
            return RecurseOutcome::Rejected(RecurseRejection::DepthMismatch {
                expected: path.depth,
                received: depth,
            });
        }
        let next = path.depth.saturating_add(1);

        if let Some(direction) = root {
            if path.committed {
                return RecurseOutcome::Settled;
            }
            return RecurseOutcome::Reflood {
                amount: path.amount,
                direction,
            };
        }
        if path.is_bridged() {
            return RecurseOutcome::Settled;
        }
        match path.upstream() {
            Some(to) => RecurseOutcome::Forward {
                to: to.clone(),
                depth: next,
            },
            None => RecurseOutcome::Rejected(RecurseRejection::NoUpstream),
        }
    }

    /// Record the effect of a planned recursion: any accepted recursion
    /// advances the path's depth by one.
    pub fn apply_recurse(&mut self, id: PaymentId, outcome: &RecurseOutcome, now: Instant) {
        self.refresh(now);
        if matches!(outcome, RecurseOutcome::Rejected(_)) {
            return;
        }
        let expires_at = now + self.timeout;
        if let Some(path) = self.paths.get_mut(&id) {
            path.depth = path.depth.saturating_add(1);
            path.expires_at = path.expires_at.max(expires_at);
        }
    }

    #[cfg(test)]
    fn on_recurse(&mut self, id: PaymentId, depth: u32, now: Instant) -> RecurseOutcome {
        let outcome = self.plan_recurse(id, depth);
        self.apply_recurse(id, &outcome, now);
        outcome
    }
}
