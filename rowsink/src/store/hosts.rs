//! Store endpoint selection.
//!
//! One host is chosen out of the configured list once per process start. The
//! strategy is injectable so tests can pin the choice down deterministically
//! instead of relying on globally seeded randomness.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rowsink_config::shared::HostSelection;

/// Picks one endpoint out of a non-empty host list.
#[derive(Debug)]
pub enum HostSelector {
    /// Always pick the first host.
    First,
    /// Pick a host at random.
    Random(StdRng),
}

impl HostSelector {
    /// Builds a selector from its configuration.
    pub fn from_config(config: &HostSelection) -> Self {
        match config {
            HostSelection::First => Self::First,
            HostSelection::Random { seed: Some(seed) } => {
                Self::Random(StdRng::seed_from_u64(*seed))
            }
            HostSelection::Random { seed: None } => Self::Random(StdRng::from_entropy()),
        }
    }

    /// Picks a host from the list, or `None` if the list is empty.
    pub fn pick<'a>(&mut self, hosts: &'a [String]) -> Option<&'a str> {
        match self {
            Self::First => hosts.first().map(String::as_str),
            Self::Random(rng) => {
                if hosts.is_empty() {
                    return None;
                }
                hosts.get(rng.gen_range(0..hosts.len())).map(String::as_str)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn test_first_host_selection() {
        let mut selector = HostSelector::from_config(&HostSelection::First);
        assert_eq!(selector.pick(&hosts()), Some("a"));
    }

    #[test]
    fn test_seeded_selection_is_deterministic() {
        let config = HostSelection::Random { seed: Some(7) };

        let mut first = HostSelector::from_config(&config);
        let mut second = HostSelector::from_config(&config);

        let hosts = hosts();
        for _ in 0..16 {
            assert_eq!(first.pick(&hosts), second.pick(&hosts));
        }
    }

    #[test]
    fn test_empty_host_list() {
        let mut selector = HostSelector::from_config(&HostSelection::First);
        assert_eq!(selector.pick(&[]), None);

        let mut selector = HostSelector::from_config(&HostSelection::Random { seed: Some(1) });
        assert_eq!(selector.pick(&[]), None);
    }
}
