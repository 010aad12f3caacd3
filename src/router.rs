//! # Topic Router
//!
//! Maps subscription patterns to [`Route`] tags. The link keeps the
//! router as the single source of truth for what the session should be
//! subscribed to, so it can replay every pattern after a reconnect.

use heapless::Vec;

use crate::topic::{self, MAX_TOPIC_LEN, TopicBuf};

/// Where an inbound message should be delivered.
///
/// `Discovery` and `Heartbeat` are consumed by the link itself; the
/// remaining routes reach the firmware through
/// [`FleetHandler::on_route`](crate::link::FleetHandler::on_route).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Route {
    Discovery,
    Heartbeat,
    NodeCommand,
    FleetCommand,
    ZoneCommand,
    StatusUpdate,
    Telemetry,
    OtaEvent,
}

/// One pattern-to-route binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub pattern: TopicBuf,
    pub route: Route,
}

/// Fixed-capacity routing table.
#[derive(Debug, Default)]
pub struct Router<const MAX_SUBS: usize> {
    subs: Vec<Subscription, MAX_SUBS>,
}

impl<const MAX_SUBS: usize> Router<MAX_SUBS> {
    pub const fn new() -> Self {
        Self { subs: Vec::new() }
    }

    /// Binds `pattern` to `route`. Re-binding an existing pattern
    /// replaces its route instead of adding a duplicate. Returns `false`
    /// when the pattern does not fit or the table is full.
    pub fn subscribe(&mut self, pattern: &str, route: Route) -> bool {
        let Some(pattern) = topic::bounded::<MAX_TOPIC_LEN>(pattern) else {
            return false;
        };
        if let Some(existing) = self.subs.iter_mut().find(|s| s.pattern == pattern) {
            existing.route = route;
            return true;
        }
        self.subs.push(Subscription { pattern, route }).is_ok()
    }

    /// Removes the binding for `pattern`. Returns `true` if it existed.
    pub fn unsubscribe(&mut self, pattern: &str) -> bool {
        let before = self.subs.len();
        self.subs.retain(|s| s.pattern.as_str() != pattern);
        self.subs.len() != before
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.subs.iter().any(|s| s.pattern.as_str() == pattern)
    }

    /// Routes for every pattern matching `topic`, in registration order.
    /// A topic crossing several patterns yields several routes.
    pub fn matches<'a>(&'a self, topic: &'a str) -> impl Iterator<Item = Route> + 'a {
        self.subs
            .iter()
            .filter(move |s| topic::matches(topic, s.pattern.as_str()))
            .map(|s| s.route)
    }

    /// All registered bindings, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.subs.iter()
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<const N: usize>(router: &Router<N>, topic: &str) -> Vec<Route, N> {
        router.matches(topic).collect()
    }

    #[test]
    fn routes_by_pattern_match() {
        let mut router: Router<8> = Router::new();
        assert!(router.subscribe("luces/cmd/LUM_7/#", Route::NodeCommand));
        assert!(router.subscribe("luces/discovery", Route::Discovery));

        assert_eq!(
            collect(&router, "luces/cmd/LUM_7/on").as_slice(),
            &[Route::NodeCommand]
        );
        assert_eq!(
            collect(&router, "luces/discovery").as_slice(),
            &[Route::Discovery]
        );
        assert!(collect(&router, "luces/telemetry/LUM_7").is_empty());
    }

    #[test]
    fn overlapping_patterns_fire_in_registration_order() {
        let mut router: Router<8> = Router::new();
        router.subscribe("luces/cmd/LUM_7/#", Route::NodeCommand);
        router.subscribe("luces/cmd/LUM_7/on", Route::Telemetry);

        assert_eq!(
            collect(&router, "luces/cmd/LUM_7/on").as_slice(),
            &[Route::NodeCommand, Route::Telemetry]
        );
    }

    #[test]
    fn rebinding_a_pattern_replaces_its_route() {
        let mut router: Router<8> = Router::new();
        router.subscribe("luces/zone/plaza/#", Route::ZoneCommand);
        router.subscribe("luces/zone/plaza/#", Route::FleetCommand);

        assert_eq!(router.len(), 1);
        assert_eq!(
            collect(&router, "luces/zone/plaza").as_slice(),
            &[Route::FleetCommand]
        );
    }

    #[test]
    fn unsubscribe_removes_only_the_named_pattern() {
        let mut router: Router<8> = Router::new();
        router.subscribe("luces/cmd/LUM_7/#", Route::NodeCommand);
        router.subscribe("luces/cmd/all/#", Route::FleetCommand);

        assert!(router.unsubscribe("luces/cmd/LUM_7/#"));
        assert!(!router.unsubscribe("luces/cmd/LUM_7/#"));
        assert_eq!(router.len(), 1);
        assert!(router.contains("luces/cmd/all/#"));
    }

    #[test]
    fn full_table_rejects_new_patterns() {
        let mut router: Router<2> = Router::new();
        assert!(router.subscribe("a/1", Route::Telemetry));
        assert!(router.subscribe("a/2", Route::Telemetry));
        assert!(!router.subscribe("a/3", Route::Telemetry));
        // Replacing still works when full.
        assert!(router.subscribe("a/1", Route::StatusUpdate));
    }
}
