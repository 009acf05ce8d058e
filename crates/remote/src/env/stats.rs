use std::collections::HashMap;

use crate::net::{ObservationOption, ObservationPacket, StatsSnapshot};

/// Running view of Minecraft's stat counters, built from the stat options
/// attached to observations.
///
/// The mod sends one authoritative full snapshot and incremental deltas
/// afterwards. The cache is a two-level map: category -> id -> value, e.g.
/// `cache.get("minecraft:picked_up", "minecraft:dirt")`.
#[derive(Debug, Default)]
pub struct StatsCache {
    stats: HashMap<String, HashMap<String, i64>>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold any stat options carried by `packet` into the cache.
    pub fn update(&mut self, packet: &ObservationPacket) {
        for option in &packet.options {
            self.apply(option);
        }
    }

    pub fn apply(&mut self, option: &ObservationOption) {
        match option {
            ObservationOption::StatsFull(snapshot) => {
                self.stats.clear();
                self.merge(snapshot);
            }
            ObservationOption::StatsUpdate(snapshot) => self.merge(snapshot),
            ObservationOption::Unknown => {}
        }
    }

    fn merge(&mut self, snapshot: &StatsSnapshot) {
        for category in &snapshot.categories {
            let entries = self.stats.entry(category.category.clone()).or_default();
            for stat in &category.stats {
                *entries.entry(stat.id.clone()).or_default() += stat.value;
            }
        }
    }

    /// Current value of one stat; missing entries read as 0.
    pub fn get(&self, category: &str, id: &str) -> i64 {
        self.stats
            .get(category)
            .and_then(|entries| entries.get(id))
            .copied()
            .unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.stats.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{StatCategory, StatEntry};

    fn snapshot(entries: &[(&str, &str, i64)]) -> StatsSnapshot {
        let mut categories: Vec<StatCategory> = Vec::new();
        for (category, id, value) in entries {
            let entry = StatEntry {
                id: (*id).into(),
                value: *value,
            };
            match categories.iter_mut().find(|c| c.category == *category) {
                Some(cat) => cat.stats.push(entry),
                None => categories.push(StatCategory {
                    category: (*category).into(),
                    stats: vec![entry],
                }),
            }
        }
        StatsSnapshot { categories }
    }

    #[test]
    fn test_full_replaces_cache() {
        let mut cache = StatsCache::new();
        cache.apply(&ObservationOption::StatsFull(snapshot(&[(
            "minecraft:mined",
            "minecraft:stone",
            5,
        )])));
        cache.apply(&ObservationOption::StatsFull(snapshot(&[(
            "minecraft:mined",
            "minecraft:dirt",
            2,
        )])));
        assert_eq!(cache.get("minecraft:mined", "minecraft:stone"), 0);
        assert_eq!(cache.get("minecraft:mined", "minecraft:dirt"), 2);
    }

    #[test]
    fn test_update_increments() {
        let mut cache = StatsCache::new();
        cache.apply(&ObservationOption::StatsFull(snapshot(&[(
            "minecraft:mined",
            "minecraft:stone",
            5,
        )])));
        cache.apply(&ObservationOption::StatsUpdate(snapshot(&[
            ("minecraft:mined", "minecraft:stone", 3),
            ("minecraft:picked_up", "minecraft:dirt", 1),
        ])));
        assert_eq!(cache.get("minecraft:mined", "minecraft:stone"), 8);
        assert_eq!(cache.get("minecraft:picked_up", "minecraft:dirt"), 1);
    }

    #[test]
    fn test_missing_reads_zero() {
        let cache = StatsCache::new();
        assert_eq!(cache.get("minecraft:mined", "minecraft:stone"), 0);
    }

    #[test]
    fn test_update_from_packet_options() {
        let packet = ObservationPacket {
            options: vec![
                ObservationOption::StatsFull(snapshot(&[("minecraft:custom", "minecraft:jump", 7)])),
                ObservationOption::Unknown,
            ],
            ..ObservationPacket::default()
        };
        let mut cache = StatsCache::new();
        cache.update(&packet);
        assert_eq!(cache.get("minecraft:custom", "minecraft:jump"), 7);
    }
}
