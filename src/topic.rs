//! # Topic Grammar
//!
//! Builders for every topic the fleet uses, all rooted under a
//! configurable base (`luces` by default):
//!
//! | topic                      | purpose                              |
//! |----------------------------|--------------------------------------|
//! | `<base>/discovery`         | node announces                       |
//! | `<base>/status/<id>`       | retained presence, also the will     |
//! | `<base>/cmd/<target>`      | commands; target is an id or `all`   |
//! | `<base>/zone/<zone>`       | zone-wide commands                   |
//! | `<base>/telemetry/<id>`    | sensor readings                      |
//! | `<base>/heartbeat/<id>`    | liveness beacons                     |
//! | `<base>/ota/available`     | retained firmware notice             |
//! | `<base>/ota/status/<id>`   | per-node update state                |
//! | `<base>/ota/progress/<id>` | per-node download progress           |
//! | `<base>/ota/complete/<id>` | per-node update result               |
//!
//! Matching is deliberately narrow: a pattern is either a literal topic
//! or ends in `/#`, which matches the stem itself and any deeper level.
//! Single-level `+` wildcards are not part of the grammar.

use heapless::String;

/// Longest topic the link will build or route.
pub const MAX_TOPIC_LEN: usize = 96;

/// Owned topic string, sized for the link's limit.
pub type TopicBuf = String<MAX_TOPIC_LEN>;

pub(crate) fn bounded<const N: usize>(text: &str) -> Option<String<N>> {
    let mut out = String::new();
    out.push_str(text).ok()?;
    Some(out)
}

fn build(parts: &[&str]) -> Option<TopicBuf> {
    let mut out = TopicBuf::new();
    for part in parts {
        out.push_str(part).ok()?;
    }
    Some(out)
}

/// `<base>/discovery`
pub fn discovery(base: &str) -> Option<TopicBuf> {
    build(&[base, "/discovery"])
}

/// `<base>/status/<node_id>`
pub fn status(base: &str, node_id: &str) -> Option<TopicBuf> {
    build(&[base, "/status/", node_id])
}

/// `<base>/cmd/<target>` where target is a node id or `all`.
pub fn command(base: &str, target: &str) -> Option<TopicBuf> {
    build(&[base, "/cmd/", target])
}

/// `<base>/cmd/all`
pub fn fleet_command(base: &str) -> Option<TopicBuf> {
    command(base, "all")
}

/// Filter covering everything addressed to one node.
pub fn node_command_filter(base: &str, node_id: &str) -> Option<TopicBuf> {
    build(&[base, "/cmd/", node_id, "/#"])
}

/// Filter covering fleet-wide broadcasts.
pub fn fleet_command_filter(base: &str) -> Option<TopicBuf> {
    build(&[base, "/cmd/all/#"])
}

/// `<base>/zone/<zone_id>`
pub fn zone(base: &str, zone_id: &str) -> Option<TopicBuf> {
    build(&[base, "/zone/", zone_id])
}

/// Filter covering one zone's command channel.
pub fn zone_filter(base: &str, zone_id: &str) -> Option<TopicBuf> {
    build(&[base, "/zone/", zone_id, "/#"])
}

/// `<base>/telemetry/<node_id>`
pub fn telemetry(base: &str, node_id: &str) -> Option<TopicBuf> {
    build(&[base, "/telemetry/", node_id])
}

/// `<base>/heartbeat/<node_id>`
pub fn heartbeat(base: &str, node_id: &str) -> Option<TopicBuf> {
    build(&[base, "/heartbeat/", node_id])
}

/// Filter covering every node's heartbeat.
pub fn heartbeat_filter(base: &str) -> Option<TopicBuf> {
    build(&[base, "/heartbeat/#"])
}

/// `<base>/ota/available`
pub fn ota_available(base: &str) -> Option<TopicBuf> {
    build(&[base, "/ota/available"])
}

/// `<base>/ota/status/<node_id>`
pub fn ota_status(base: &str, node_id: &str) -> Option<TopicBuf> {
    build(&[base, "/ota/status/", node_id])
}

/// `<base>/ota/progress/<node_id>`
pub fn ota_progress(base: &str, node_id: &str) -> Option<TopicBuf> {
    build(&[base, "/ota/progress/", node_id])
}

/// `<base>/ota/complete/<node_id>`
pub fn ota_complete(base: &str, node_id: &str) -> Option<TopicBuf> {
    build(&[base, "/ota/complete/", node_id])
}

/// Returns the text after the last `/`, the node id on per-node topics.
pub fn leaf(topic: &str) -> Option<&str> {
    topic.rsplit_once('/').map(|(_, tail)| tail)
}

/// Tests `topic` against `pattern`.
///
/// A bare `#` matches everything. A pattern ending in `/#` matches its
/// stem and any topic nested below the stem, and nothing else: `a/b/#`
/// matches `a/b` and `a/b/c/d` but not `a/bc`. Any other pattern must
/// match the topic exactly.
pub fn matches(topic: &str, pattern: &str) -> bool {
    if pattern == "#" {
        return true;
    }
    if let Some(stem) = pattern.strip_suffix("/#") {
        return topic == stem
            || (topic.len() > stem.len()
                && topic.starts_with(stem)
                && topic.as_bytes()[stem.len()] == b'/');
    }
    topic == pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===== BUILDERS =====

    #[test]
    fn builders_produce_the_documented_layout() {
        assert_eq!(discovery("luces").unwrap(), "luces/discovery");
        assert_eq!(status("luces", "LUM_7").unwrap(), "luces/status/LUM_7");
        assert_eq!(command("luces", "LUM_7").unwrap(), "luces/cmd/LUM_7");
        assert_eq!(fleet_command("luces").unwrap(), "luces/cmd/all");
        assert_eq!(
            node_command_filter("luces", "LUM_7").unwrap(),
            "luces/cmd/LUM_7/#"
        );
        assert_eq!(fleet_command_filter("luces").unwrap(), "luces/cmd/all/#");
        assert_eq!(zone("luces", "plaza").unwrap(), "luces/zone/plaza");
        assert_eq!(zone_filter("luces", "plaza").unwrap(), "luces/zone/plaza/#");
        assert_eq!(telemetry("luces", "LUM_7").unwrap(), "luces/telemetry/LUM_7");
        assert_eq!(heartbeat("luces", "LUM_7").unwrap(), "luces/heartbeat/LUM_7");
        assert_eq!(heartbeat_filter("luces").unwrap(), "luces/heartbeat/#");
        assert_eq!(ota_available("luces").unwrap(), "luces/ota/available");
        assert_eq!(ota_status("luces", "LUM_7").unwrap(), "luces/ota/status/LUM_7");
        assert_eq!(
            ota_progress("luces", "LUM_7").unwrap(),
            "luces/ota/progress/LUM_7"
        );
        assert_eq!(
            ota_complete("luces", "LUM_7").unwrap(),
            "luces/ota/complete/LUM_7"
        );
    }

    #[test]
    fn builders_reject_oversized_input() {
        let long_id = core::str::from_utf8(&[b'x'; 200]).unwrap();
        assert!(status("luces", long_id).is_none());
    }

    #[test]
    fn leaf_returns_the_last_level() {
        assert_eq!(leaf("luces/heartbeat/LUM_7"), Some("LUM_7"));
        assert_eq!(leaf("luces/discovery"), Some("discovery"));
        assert_eq!(leaf("nolevels"), None);
    }

    // ===== MATCHING =====

    #[test]
    fn literal_patterns_require_exact_equality() {
        assert!(matches("luces/discovery", "luces/discovery"));
        assert!(!matches("luces/discovery", "luces/discover"));
        assert!(!matches("luces/discovery/x", "luces/discovery"));
    }

    #[test]
    fn hash_suffix_matches_stem_and_descendants() {
        assert!(matches("luces/cmd/LUM_7", "luces/cmd/LUM_7/#"));
        assert!(matches("luces/cmd/LUM_7/on", "luces/cmd/LUM_7/#"));
        assert!(matches("luces/cmd/LUM_7/a/b/c", "luces/cmd/LUM_7/#"));
    }

    #[test]
    fn hash_suffix_does_not_leak_across_siblings() {
        assert!(!matches("luces/cmd/LUM_8", "luces/cmd/LUM_7/#"));
        assert!(!matches("luces/cmd/LUM_70", "luces/cmd/LUM_7/#"));
        assert!(!matches("a/bc", "a/b/#"));
        assert!(!matches("a/x", "a/b/#"));
    }

    #[test]
    fn bare_hash_matches_everything() {
        assert!(matches("luces/cmd/LUM_7", "#"));
        assert!(matches("anything", "#"));
    }
}
