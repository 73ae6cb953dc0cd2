//! Subscription targets and the packet-id ledger used for SubAck diagnostics.

use shared_types::DeviceEntry;
use std::collections::{HashMap, HashSet, VecDeque};

/// Source of the devices this instance listens to.
pub trait SubscriptionTargets: Send + Sync {
    /// Devices in priority order: readers, then servers, then QR servers.
    fn subscription_targets(&self) -> Vec<DeviceEntry>;
}

/// Enabled, non-empty serials other than `own_serial`, first occurrence wins.
///
/// Serials come back trimmed; comparisons are made on the trimmed form.
#[must_use]
pub fn dedupe_targets(
    entries: impl IntoIterator<Item = DeviceEntry>,
    own_serial: &str,
) -> Vec<DeviceEntry> {
    let own_serial = own_serial.trim();
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| entry.enabled)
        .map(|mut entry| {
            entry.serial = entry.serial.trim().to_string();
            entry
        })
        .filter(|entry| !entry.serial.is_empty() && entry.serial != own_serial)
        .filter(|entry| seen.insert(entry.serial.clone()))
        .collect()
}

/// A subscribe request awaiting its SubAck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEntry {
    pub topic: String,
    pub device_name: String,
}

/// Maps subscribe packet ids back to (topic, device).
///
/// The client assigns packet ids when it sends, in request order, so
/// requests are queued and matched to ids as the outgoing packets appear.
#[derive(Debug, Default)]
pub struct SubscriptionLedger {
    pending: VecDeque<SubscriptionEntry>,
    by_packet: HashMap<u16, SubscriptionEntry>,
}

impl SubscriptionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request handed to the client.
    pub fn requested(&mut self, topic: impl Into<String>, device_name: impl Into<String>) {
        self.pending.push_back(SubscriptionEntry {
            topic: topic.into(),
            device_name: device_name.into(),
        });
    }

    /// Forget the newest request; the client rejected it.
    pub fn withdraw_last(&mut self) {
        self.pending.pop_back();
    }

    /// The next outgoing subscribe got packet id `pkid`.
    pub fn assign(&mut self, pkid: u16) -> Option<&SubscriptionEntry> {
        let entry = self.pending.pop_front()?;
        self.by_packet.insert(pkid, entry);
        self.by_packet.get(&pkid)
    }

    /// SubAck for `pkid` arrived.
    pub fn acknowledged(&mut self, pkid: u16) -> Option<SubscriptionEntry> {
        self.by_packet.remove(&pkid)
    }

    /// Drop everything; a new session starts from scratch.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.by_packet.clear();
    }

    /// Requests not yet acknowledged.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.pending.len() + self.by_packet.len()
    }
}
