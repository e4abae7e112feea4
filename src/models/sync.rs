use super::event::CalendarEvent;

/// What changed when a fetched snapshot was merged into the store.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Events whose id was not present before the merge.
    pub added: Vec<CalendarEvent>,
    /// Events that disappeared from the feed while still ahead of us and
    /// not suppressed; these deserve a "removed" notice.
    pub removed: Vec<CalendarEvent>,
    /// Ids present before and after whose etag changed.
    pub updated: usize,
    /// True when the stored set differs in any observable way, including
    /// etag-only revisions (the tray must be rebuilt so its keys resolve).
    pub changed: bool,
}

/// Summary of one reconcile cycle, for logging and tests.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub success: bool,
    pub fetched: usize,
    pub added: usize,
    pub removed: usize,
    pub updated: usize,
    pub pruned: usize,
    pub changed: bool,
    pub alerts_fired: usize,
    pub error_message: Option<String>,
}

impl CycleOutcome {
    pub fn success(fetched: usize, merge: &MergeOutcome, pruned: usize, alerts_fired: usize) -> Self {
        Self {
            success: true,
            fetched,
            added: merge.added.len(),
            removed: merge.removed.len(),
            updated: merge.updated,
            pruned,
            changed: merge.changed || pruned > 0,
            alerts_fired,
            error_message: None,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            fetched: 0,
            added: 0,
            removed: 0,
            updated: 0,
            pruned: 0,
            changed: false,
            alerts_fired: 0,
            error_message: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_outcome_success_counts() {
        let merge = MergeOutcome {
            updated: 2,
            changed: true,
            ..MergeOutcome::default()
        };
        let outcome = CycleOutcome::success(7, &merge, 1, 3);
        assert!(outcome.success);
        assert_eq!(outcome.fetched, 7);
        assert_eq!(outcome.updated, 2);
        assert_eq!(outcome.pruned, 1);
        assert_eq!(outcome.alerts_fired, 3);
        assert!(outcome.changed);
        assert!(outcome.error_message.is_none());
    }

    #[test]
    fn test_cycle_outcome_pruning_alone_counts_as_change() {
        let merge = MergeOutcome::default();
        let outcome = CycleOutcome::success(0, &merge, 2, 0);
        assert!(outcome.changed);
    }

    #[test]
    fn test_cycle_outcome_failure() {
        let outcome = CycleOutcome::failure("Network error".to_string());
        assert!(!outcome.success);
        assert!(!outcome.changed);
        assert_eq!(outcome.error_message, Some("Network error".to_string()));
    }
}
