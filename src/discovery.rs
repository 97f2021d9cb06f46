//! Port discovery and pairing.
//!
//! Ports are found by probing: every number from 1 to the configured maximum
//! is opened exclusively and released at once. Openable ports are then paired
//! in ascending order, two at a time, on the assumption that consecutive
//! virtual ports are the two ends of one emulated null-modem cable.

use crate::port::{PortId, PortOpener};
use std::fmt;
use tracing::{debug, info};

/// Highest port number probed by default.
pub const DEFAULT_MAX_PORT: u16 = 256;

/// Two distinct ports that were both openable at discovery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortPair {
    first: PortId,
    second: PortId,
}

impl PortPair {
    /// `None` when both ids are the same port.
    pub fn new(first: PortId, second: PortId) -> Option<Self> {
        (first != second).then_some(Self { first, second })
    }

    pub fn first(&self) -> PortId {
        self.first
    }

    pub fn second(&self) -> PortId {
        self.second
    }

    pub fn contains(&self, id: PortId) -> bool {
        self.first == id || self.second == id
    }

    /// The other end of the pair, if `id` belongs to it.
    pub fn partner_of(&self, id: PortId) -> Option<PortId> {
        if id == self.first {
            Some(self.second)
        } else if id == self.second {
            Some(self.first)
        } else {
            None
        }
    }
}

impl fmt::Display for PortPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.first, self.second)
    }
}

/// Probe ports `1..=max_port` and pair the ones that open.
///
/// A failed probe just excludes that port; missing and busy ports are not
/// told apart. An empty result means fewer than two ports opened.
pub fn discover_pairs(opener: &dyn PortOpener, max_port: u16) -> Vec<PortPair> {
    let available: Vec<PortId> = PortId::range_to(max_port)
        .filter(|&id| {
            let openable = opener.probe(id);
            if openable {
                debug!(port = %id, "probe succeeded");
            }
            openable
        })
        .collect();

    let pairs = pair_consecutive(&available);
    info!(
        probed = max_port,
        available = available.len(),
        pairs = pairs.len(),
        "port discovery finished"
    );
    pairs
}

/// Pair `ids` as `(ids[0], ids[1]), (ids[2], ids[3]), ...`, dropping an odd
/// trailing id.
///
/// `ids` is expected ascending and duplicate free, as discovery produces it;
/// a chunk whose two ids are equal is skipped.
pub fn pair_consecutive(ids: &[PortId]) -> Vec<PortPair> {
    ids.chunks_exact(2)
        .filter_map(|chunk| PortPair::new(chunk[0], chunk[1]))
        .collect()
}

/// The pair containing `id`, if any.
pub fn find_pair(pairs: &[PortPair], id: PortId) -> Option<&PortPair> {
    pairs.iter().find(|pair| pair.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{MockOpener, MockSerialPort};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn id(n: u16) -> PortId {
        PortId::new(n).unwrap()
    }

    fn ids(numbers: &[u16]) -> Vec<PortId> {
        numbers.iter().map(|&n| id(n)).collect()
    }

    fn opener_with(numbers: &[u16]) -> MockOpener {
        numbers.iter().fold(MockOpener::new(), |opener, &n| {
            opener.with_port(id(n), &MockSerialPort::new(format!("COM{n}")))
        })
    }

    #[test]
    fn test_pairs_consecutive_ids() {
        let pairs = pair_consecutive(&ids(&[1, 2, 3, 4]));
        assert_eq!(
            pairs,
            vec![
                PortPair::new(id(1), id(2)).unwrap(),
                PortPair::new(id(3), id(4)).unwrap(),
            ]
        );
    }

    #[test]
    fn test_odd_trailing_port_is_dropped() {
        let pairs = pair_consecutive(&ids(&[3, 7, 9]));
        assert_eq!(pairs, vec![PortPair::new(id(3), id(7)).unwrap()]);
        assert!(pair_consecutive(&ids(&[4])).is_empty());
        assert!(pair_consecutive(&[]).is_empty());
    }

    #[test]
    fn test_discovery_pairs_only_openable_ports() {
        let opener = opener_with(&[2, 5]);
        let pairs = discover_pairs(&opener, 8);
        assert_eq!(pairs, vec![PortPair::new(id(2), id(5)).unwrap()]);

        // Every number was probed once, ascending, and nothing stayed open.
        assert_eq!(opener.open_log(), PortId::range_to(8).collect::<Vec<_>>());
        assert_eq!(opener.open_handles(), 0);
    }

    #[test]
    fn test_discovery_with_single_port_is_empty() {
        assert!(discover_pairs(&opener_with(&[4]), 16).is_empty());
        assert!(discover_pairs(&MockOpener::new(), 16).is_empty());
    }

    #[test]
    fn test_busy_port_is_excluded() {
        let busy = MockSerialPort::new("COM3");
        let opener = opener_with(&[1, 2, 4]).with_port(id(3), &busy);
        let _held = busy.lease();

        let pairs = discover_pairs(&opener, 4);
        assert_eq!(pairs, vec![PortPair::new(id(1), id(2)).unwrap()]);
    }

    #[test]
    fn test_partner_lookup() {
        let pair = PortPair::new(id(2), id(5)).unwrap();
        assert_eq!(pair.partner_of(id(2)), Some(id(5)));
        assert_eq!(pair.partner_of(id(5)), Some(id(2)));
        assert_eq!(pair.partner_of(id(3)), None);
        assert_eq!(pair.to_string(), "COM2 <-> COM5");

        let pairs = vec![pair, PortPair::new(id(7), id(8)).unwrap()];
        assert_eq!(find_pair(&pairs, id(8)).map(PortPair::first), Some(id(7)));
        assert!(find_pair(&pairs, id(6)).is_none());
    }

    #[test]
    fn test_pair_rejects_same_port() {
        assert!(PortPair::new(id(4), id(4)).is_none());
    }

    proptest! {
        #[test]
        fn prop_pairing_is_deterministic(numbers in proptest::collection::btree_set(1u16..=256, 0..40)) {
            let sorted: Vec<PortId> = numbers.iter().map(|&n| id(n)).collect();
            let pairs = pair_consecutive(&sorted);

            prop_assert_eq!(pairs.len(), sorted.len() / 2);
            for (i, pair) in pairs.iter().enumerate() {
                prop_assert_eq!(pair.first(), sorted[2 * i]);
                prop_assert_eq!(pair.second(), sorted[2 * i + 1]);
                prop_assert!(pair.first() < pair.second());
            }
        }
    }
}
