//! Time axis shared by the selectors of a viewer.
//!
//! Each selector reports a named *time set*: every instant it knows about,
//! and the subset currently backed by a resource. The [`Timeline`] merges
//! the sets and tracks the selected instant. Playback is left to callers.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

/// Receiver of time sets, implemented by [`Timeline`].
pub trait TimeAxis {
    /// Replace the full list of instants of a set.
    fn set_times_of_set(&mut self, set: &str, times: Vec<DateTime<Utc>>);

    /// Replace the instants of a set that currently have data.
    fn set_enabled_times_of_set(&mut self, set: &str, times: Vec<DateTime<Utc>>);
}

#[derive(Debug, Clone, Default)]
struct TimeSet {
    times: BTreeSet<DateTime<Utc>>,
    enabled: BTreeSet<DateTime<Utc>>,
}

/// In-memory time axis.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    sets: BTreeMap<String, TimeSet>,
    selected: Option<DateTime<Utc>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of all sets, sorted.
    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.union(|set| &set.times)
    }

    /// Instants enabled in any set, sorted.
    pub fn enabled_times(&self) -> Vec<DateTime<Utc>> {
        self.union(|set| &set.enabled)
    }

    pub fn times_of_set(&self, set: &str) -> Vec<DateTime<Utc>> {
        self.sets
            .get(set)
            .map(|s| s.times.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_enabled(&self, time: DateTime<Utc>) -> bool {
        self.sets.values().any(|set| set.enabled.contains(&time))
    }

    pub fn selected(&self) -> Option<DateTime<Utc>> {
        self.selected
    }

    /// Select an instant known to the timeline. Returns false otherwise.
    pub fn select(&mut self, time: DateTime<Utc>) -> bool {
        if !self.sets.values().any(|set| set.times.contains(&time)) {
            return false;
        }
        self.selected = Some(time);
        true
    }

    pub fn select_first_enabled(&mut self) -> Option<DateTime<Utc>> {
        let first = self.enabled_times().first().copied();
        if first.is_some() {
            self.selected = first;
        }
        first
    }

    /// Step to the next enabled instant after the selected one.
    pub fn select_next_enabled(&mut self) -> Option<DateTime<Utc>> {
        let next = match self.selected {
            Some(current) => self.enabled_times().into_iter().find(|t| *t > current),
            None => self.enabled_times().first().copied(),
        };
        if next.is_some() {
            self.selected = next;
        }
        next
    }

    /// Step to the previous enabled instant before the selected one.
    pub fn select_previous_enabled(&mut self) -> Option<DateTime<Utc>> {
        let previous = match self.selected {
            Some(current) => self.enabled_times().into_iter().rev().find(|t| *t < current),
            None => self.enabled_times().last().copied(),
        };
        if previous.is_some() {
            self.selected = previous;
        }
        previous
    }

    fn union<F>(&self, pick: F) -> Vec<DateTime<Utc>>
    where
        F: Fn(&TimeSet) -> &BTreeSet<DateTime<Utc>>,
    {
        let merged: BTreeSet<DateTime<Utc>> = self
            .sets
            .values()
            .flat_map(|set| pick(set).iter().copied())
            .collect();
        merged.into_iter().collect()
    }
}

impl TimeAxis for Timeline {
    fn set_times_of_set(&mut self, set: &str, times: Vec<DateTime<Utc>>) {
        let entry = self.sets.entry(set.to_string()).or_default();
        entry.times = times.into_iter().collect();
        let known = entry.times.clone();
        entry.enabled.retain(|t| known.contains(t));
    }

    fn set_enabled_times_of_set(&mut self, set: &str, times: Vec<DateTime<Utc>>) {
        let entry = self.sets.entry(set.to_string()).or_default();
        entry.enabled = times.into_iter().collect();
        let enabled = entry.enabled.clone();
        entry.times.extend(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_sets_are_merged() {
        let mut timeline = Timeline::new();
        timeline.set_times_of_set("gfs", vec![t(0), t(6)]);
        timeline.set_times_of_set("icon", vec![t(3), t(6)]);
        assert_eq!(timeline.times(), vec![t(0), t(3), t(6)]);
        assert_eq!(timeline.times_of_set("icon"), vec![t(3), t(6)]);
    }

    #[test]
    fn test_enabled_times_are_part_of_the_set() {
        let mut timeline = Timeline::new();
        timeline.set_times_of_set("gfs", vec![t(0), t(6)]);
        timeline.set_enabled_times_of_set("gfs", vec![t(6), t(12)]);
        assert_eq!(timeline.times(), vec![t(0), t(6), t(12)]);
        assert!(timeline.is_enabled(t(12)));
        assert!(!timeline.is_enabled(t(0)));

        // shrinking the set drops enabled instants that fell out
        timeline.set_times_of_set("gfs", vec![t(0)]);
        assert!(timeline.enabled_times().is_empty());
    }

    #[test]
    fn test_stepping_through_enabled_times() {
        let mut timeline = Timeline::new();
        timeline.set_times_of_set("gfs", vec![t(0), t(3), t(6), t(9)]);
        timeline.set_enabled_times_of_set("gfs", vec![t(0), t(6), t(9)]);

        assert_eq!(timeline.select_first_enabled(), Some(t(0)));
        assert_eq!(timeline.select_next_enabled(), Some(t(6)));
        assert_eq!(timeline.select_next_enabled(), Some(t(9)));
        assert_eq!(timeline.select_next_enabled(), None);
        assert_eq!(timeline.selected(), Some(t(9)));
        assert_eq!(timeline.select_previous_enabled(), Some(t(6)));
    }

    #[test]
    fn test_select_unknown_time_is_rejected() {
        let mut timeline = Timeline::new();
        timeline.set_times_of_set("gfs", vec![t(0)]);
        assert!(!timeline.select(t(1)));
        assert!(timeline.select(t(0)));
        assert_eq!(timeline.selected(), Some(t(0)));
    }
}
