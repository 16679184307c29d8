// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn anchor_action_is_the_index_zero_step() {
    let binding = BindingSequence {
        name: "bind-0".into(),
        timeout: Duration::from_secs(2),
        priority: 0,
        actions: vec![
            BindingAction {
                name: "Detect-0".into(),
                mandatory: true,
                timeout_override: None,
                sequence_index: 0,
            },
            BindingAction {
                name: "Safety-chk-0".into(),
                mandatory: true,
                timeout_override: Some(Duration::from_secs(1)),
                sequence_index: 1,
            },
        ],
    };
    assert_eq!(binding.anchor_action(), Some("Detect-0"));
}

#[test]
fn anchor_action_is_none_for_an_empty_action_list() {
    let binding = BindingSequence {
        name: "empty".into(),
        timeout: Duration::from_secs(1),
        priority: 0,
        actions: vec![],
    };
    assert_eq!(binding.anchor_action(), None);
}
