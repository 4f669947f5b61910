use crate::models::InteractionEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

/// Per (user, city) behavior record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitRecord {
    pub city_id: String,
    /// Never decreases
    pub visit_count: u32,
    /// None while the record only holds sections or interactions
    pub last_visited_at: Option<DateTime<Utc>>,
    pub explored_sections: BTreeSet<String>,
    pub interaction_log: VecDeque<InteractionEvent>,
    /// Seconds accrued by the visit-tracking timer
    pub dwell_secs: u64,
}

impl VisitRecord {
    pub fn new(city_id: impl Into<String>) -> Self {
        Self {
            city_id: city_id.into(),
            visit_count: 0,
            last_visited_at: None,
            explored_sections: BTreeSet::new(),
            interaction_log: VecDeque::new(),
            dwell_secs: 0,
        }
    }

    pub fn is_visited(&self) -> bool {
        self.visit_count > 0
    }

    /// Count a visit unless the previous one is within `throttle`.
    /// `last_visited_at` moves forward either way. Returns whether the count grew.
    pub fn register_visit(&mut self, now: DateTime<Utc>, throttle: Duration) -> bool {
        let counted = match self.last_visited_at {
            None => true,
            Some(last) => match (now - last).to_std() {
                Ok(elapsed) => elapsed > throttle,
                // clock went backwards
                Err(_) => false,
            },
        };

        if counted {
            self.visit_count = self.visit_count.saturating_add(1);
        }
        self.touch(now);
        counted
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_visited_at = Some(match self.last_visited_at {
            Some(last) if last > now => last,
            _ => now,
        });
    }

    /// Append to the log, evicting from the front once `capacity` is exceeded.
    /// Returns the evicted entries, oldest first.
    pub fn push_interaction(
        &mut self,
        event: InteractionEvent,
        capacity: usize,
    ) -> Vec<InteractionEvent> {
        self.interaction_log.push_back(event);

        let mut evicted = Vec::new();
        while self.interaction_log.len() > capacity {
            if let Some(oldest) = self.interaction_log.pop_front() {
                evicted.push(oldest);
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InteractionKind;
    use chrono::Duration as ChronoDuration;

    const THROTTLE: Duration = Duration::from_secs(30);

    #[test]
    fn test_first_visit_counts() {
        let mut record = VisitRecord::new("lisbon");
        assert!(!record.is_visited());
        assert!(record.register_visit(Utc::now(), THROTTLE));
        assert_eq!(record.visit_count, 1);
    }

    #[test]
    fn test_visit_within_throttle_only_touches() {
        let start = Utc::now();
        let mut record = VisitRecord::new("lisbon");
        record.register_visit(start, THROTTLE);

        let soon = start + ChronoDuration::seconds(10);
        assert!(!record.register_visit(soon, THROTTLE));
        assert_eq!(record.visit_count, 1);
        assert_eq!(record.last_visited_at, Some(soon));
    }

    #[test]
    fn test_exactly_at_throttle_is_not_counted() {
        let start = Utc::now();
        let mut record = VisitRecord::new("lisbon");
        record.register_visit(start, THROTTLE);

        assert!(!record.register_visit(start + ChronoDuration::seconds(30), THROTTLE));
        assert!(record.register_visit(start + ChronoDuration::seconds(61), THROTTLE));
        assert_eq!(record.visit_count, 2);
    }

    #[test]
    fn test_clock_going_backwards_keeps_latest_timestamp() {
        let start = Utc::now();
        let mut record = VisitRecord::new("lisbon");
        record.register_visit(start, THROTTLE);

        assert!(!record.register_visit(start - ChronoDuration::minutes(5), THROTTLE));
        assert_eq!(record.last_visited_at, Some(start));
    }

    #[test]
    fn test_interaction_log_is_fifo_bounded() {
        let mut record = VisitRecord::new("lisbon");
        for i in 0..5 {
            let evicted =
                record.push_interaction(InteractionEvent::now(InteractionKind::Click, format!("t{i}")), 3);
            if i < 3 {
                assert!(evicted.is_empty());
            } else {
                assert_eq!(evicted.len(), 1);
                assert_eq!(evicted[0].target, format!("t{}", i - 3));
            }
        }

        let targets: Vec<&str> = record.interaction_log.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["t2", "t3", "t4"]);
    }
}
