#![allow(dead_code)]

use serde_json::json;
use stackstore_core::{AclEntry, Stack, StackComponent, StackIcon, StackSource, WorkspaceConfig};
use std::collections::BTreeSet;

pub const STACKS_SIZE: usize = 5;

/// Builds a fully populated stack whose nested values derive from `id`.
pub fn create_stack(id: &str, name: &str) -> Stack {
    Stack {
        id: id.to_string(),
        name: name.to_string(),
        creator: "user123".to_string(),
        description: format!("{id}-description"),
        scope: format!("{id}-scope"),
        tags: vec![format!("{id}-tag1"), format!("{id}-tag2")],
        components: vec![
            StackComponent::new(
                format!("{id}-component1"),
                format!("{id}-component1-version"),
            ),
            StackComponent::new(
                format!("{id}-component2"),
                format!("{id}-component2-version"),
            ),
        ],
        source: StackSource::new(format!("{id}-type"), format!("{id}-origin")),
        icon: Some(StackIcon::new(
            format!("{id}-icon"),
            format!("{id}-media-type"),
            b"0x1234567890abcdef".to_vec(),
        )),
        acl: vec![
            AclEntry::new(format!("{id}user1"), ["action1", "action2"]),
            AclEntry::new(format!("{id}user2"), ["action1", "action2"]),
        ],
        public_actions: vec!["search".to_string(), "read".to_string()],
        workspace_config: WorkspaceConfig::new(json!({
            "name": "test",
            "defaultEnv": "test",
            "environments": {
                "test": {
                    "recipe": { "type": "dockerimage", "location": "eclipse/ubuntu_jdk8" },
                    "machines": { "dev-machine": { "attributes": { "memoryLimitBytes": "2147483648" } } }
                }
            },
            "commands": [{ "name": "build", "commandLine": "mvn clean install" }],
            "projects": []
        })),
    }
}

/// Creates `stack-0..stack-4` named `name-0..name-4`.
pub fn seed_stacks<R: stackstore_core::StackRepository>(repo: &R) -> Vec<Stack> {
    let stacks: Vec<Stack> = (0..STACKS_SIZE)
        .map(|i| create_stack(&format!("stack-{i}"), &format!("name-{i}")))
        .collect();
    for stack in &stacks {
        repo.create(stack).expect("seed stack should be created");
    }
    stacks
}

pub fn ids(stacks: &[Stack]) -> BTreeSet<String> {
    stacks.iter().map(|stack| stack.id.clone()).collect()
}

/// Asserts `found` holds exactly `expected` as a set, with deep equality.
pub fn assert_same_set(found: &[Stack], expected: &[&Stack]) {
    let expected_ids: BTreeSet<String> = expected.iter().map(|stack| stack.id.clone()).collect();
    assert_eq!(ids(found), expected_ids);
    assert_eq!(found.len(), expected.len(), "duplicate stacks in result");
    for stack in found {
        let wanted = expected
            .iter()
            .find(|candidate| candidate.id == stack.id)
            .expect("id checked above");
        assert_eq!(stack, *wanted);
    }
}
