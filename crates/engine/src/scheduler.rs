// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target scheduling (§5 "Ordering guarantees", §4.4 "Tie-breaks"). Pure
//! over a snapshot of candidate targets — the supervisor calls `pick_next`
//! once per available slot.

use elm_watch_core::TargetName;
use std::collections::HashSet;

/// Everything the scheduler needs to know about one queued target to order
/// it against its peers. `configuration_index` is the target's position in
/// the config file, used as the final tie-break (§5: "configuration order").
#[derive(Debug, Clone)]
pub struct SchedulerCandidate<'a> {
    pub target_name: &'a TargetName,
    pub has_connected_client: bool,
    pub configuration_index: usize,
}

/// Orders queued targets by priority (§5: "(a) targets with a connected
/// WebSocket client, (b) targets the browser most recently focused, (c)
/// configuration order"). `focused` is `None` when no client has reported
/// focus yet.
pub fn order_candidates<'a>(mut candidates: Vec<SchedulerCandidate<'a>>, focused: Option<&TargetName>) -> Vec<SchedulerCandidate<'a>> {
    candidates.sort_by(|a, b| {
        let a_focused = focused == Some(a.target_name);
        let b_focused = focused == Some(b.target_name);
        b_focused
            .cmp(&a_focused)
            .then_with(|| b.has_connected_client.cmp(&a.has_connected_client))
            .then_with(|| a.configuration_index.cmp(&b.configuration_index))
    });
    candidates
}

/// Given an ordered candidate list and how many slots are free, return the
/// names selected to run next (§8 "Scheduler fairness": "at most K targets
/// are in ElmMakeRunning/PostprocessRunning at any instant").
pub fn select_for_slots<'a>(ordered: &'a [SchedulerCandidate<'a>], free_slots: usize) -> Vec<&'a TargetName> {
    ordered.iter().take(free_slots).map(|c| c.target_name).collect()
}

/// True if `running_count` is already at or above the parallelism cap — the
/// scheduler must not start new work (§5).
pub fn at_capacity(running_count: usize, cap: usize) -> bool {
    running_count >= cap
}

/// Filters candidates down to those not already running, guarding against
/// double-scheduling a target that somehow appears twice in one pass.
pub fn exclude_already_running<'a>(
    candidates: Vec<SchedulerCandidate<'a>>,
    already_running: &HashSet<&TargetName>,
) -> Vec<SchedulerCandidate<'a>> {
    candidates.into_iter().filter(|c| !already_running.contains(c.target_name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use elm_watch_core::test_support::test_target;

    fn name(raw: &str) -> TargetName {
        test_target(raw, &format!("{raw}.js")).name.clone()
    }

    #[test]
    fn connected_client_outranks_configuration_order() {
        let a = name("a");
        let b = name("b");
        let candidates = vec![
            SchedulerCandidate { target_name: &a, has_connected_client: false, configuration_index: 0 },
            SchedulerCandidate { target_name: &b, has_connected_client: true, configuration_index: 1 },
        ];
        let ordered = order_candidates(candidates, None);
        assert_eq!(ordered[0].target_name, &b);
    }

    #[test]
    fn focused_target_outranks_connected_but_unfocused() {
        let a = name("a");
        let b = name("b");
        let candidates = vec![
            SchedulerCandidate { target_name: &a, has_connected_client: true, configuration_index: 0 },
            SchedulerCandidate { target_name: &b, has_connected_client: true, configuration_index: 1 },
        ];
        let ordered = order_candidates(candidates, Some(&b));
        assert_eq!(ordered[0].target_name, &b);
    }

    #[test]
    fn configuration_order_breaks_remaining_ties() {
        let a = name("a");
        let b = name("b");
        let candidates = vec![
            SchedulerCandidate { target_name: &a, has_connected_client: false, configuration_index: 1 },
            SchedulerCandidate { target_name: &b, has_connected_client: false, configuration_index: 0 },
        ];
        let ordered = order_candidates(candidates, None);
        assert_eq!(ordered[0].target_name, &b);
    }

    #[test]
    fn select_for_slots_caps_at_free_slot_count() {
        let a = name("a");
        let b = name("b");
        let c = name("c");
        let candidates =
            vec![SchedulerCandidate { target_name: &a, has_connected_client: false, configuration_index: 0 }, SchedulerCandidate {
                target_name: &b,
                has_connected_client: false,
                configuration_index: 1,
            }, SchedulerCandidate { target_name: &c, has_connected_client: false, configuration_index: 2 }];
        let selected = select_for_slots(&candidates, 2);
        assert_eq!(selected, vec![&a, &b]);
    }

    #[test]
    fn at_capacity_blocks_new_scheduling() {
        assert!(at_capacity(2, 2));
        assert!(!at_capacity(1, 2));
    }
}
