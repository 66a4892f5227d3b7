mod common;

use common::{assert_same_set, create_stack, ids, seed_stacks};
use serde_json::json;
use stackstore_core::{
    AclEntry, MemoryStackRepository, RepoError, SqliteStackRepository, StackComponent, StackIcon,
    StackRepository, StackSearchQuery, StackValidationError, UniqueField, WorkspaceConfig,
};

fn check_get_by_id_returns_stored_stack<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);

    assert_eq!(repo.get_by_id(&stacks[0].id).unwrap(), stacks[0]);
}

fn check_get_by_id_missing_is_not_found<R: StackRepository>(repo: &R) {
    seed_stacks(repo);

    let err = repo.get_by_id("non-existing-stack").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == "non-existing-stack"));
}

fn check_get_by_id_blank_is_invalid_argument<R: StackRepository>(repo: &R) {
    let err = repo.get_by_id("").unwrap_err();
    assert!(matches!(
        err,
        RepoError::InvalidArgument(StackValidationError::BlankId)
    ));
}

fn check_create_roundtrips_every_field<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);

    let mut stack = create_stack("new-stack", "new-stack-name");
    stack.acl = stacks[0]
        .acl
        .iter()
        .map(|entry| AclEntry::new(entry.user.clone(), ["action1", "action2"]))
        .collect();
    repo.create(&stack).unwrap();

    assert_eq!(repo.get_by_id(&stack.id).unwrap(), stack);
}

fn check_create_without_icon_roundtrips<R: StackRepository>(repo: &R) {
    let mut stack = create_stack("iconless", "iconless-name");
    stack.icon = None;
    stack.components.clear();
    stack.acl.clear();
    stack.workspace_config = WorkspaceConfig::default();
    repo.create(&stack).unwrap();

    assert_eq!(repo.get_by_id("iconless").unwrap(), stack);
}

fn check_create_duplicate_id_conflicts<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);

    let duplicate = create_stack(&stacks[0].id, "new-name");
    let err = repo.create(&duplicate).unwrap_err();
    assert!(matches!(
        err,
        RepoError::AlreadyExists {
            field: UniqueField::Id,
            ..
        }
    ));
    assert_eq!(repo.get_by_id(&stacks[0].id).unwrap(), stacks[0]);
}

fn check_create_duplicate_name_conflicts<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);

    let duplicate = create_stack("new-stack-id", &stacks[0].name);
    let err = repo.create(&duplicate).unwrap_err();
    assert!(matches!(
        err,
        RepoError::AlreadyExists {
            field: UniqueField::Name,
            ref value,
        } if value == "name-0"
    ));
    assert!(matches!(
        repo.get_by_id("new-stack-id").unwrap_err(),
        RepoError::NotFound(_)
    ));
}

fn check_create_blank_is_invalid_argument<R: StackRepository>(repo: &R) {
    let err = repo.create(&create_stack(" ", "name")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::InvalidArgument(StackValidationError::BlankId)
    ));

    let mut bad_acl = create_stack("bad-acl", "bad-acl-name");
    bad_acl.acl.push(AclEntry::new("", ["search"]));
    let err = repo.create(&bad_acl).unwrap_err();
    assert!(matches!(
        err,
        RepoError::InvalidArgument(StackValidationError::BlankAclUser { position: 2 })
    ));
}

fn check_remove_then_get_is_not_found<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);

    repo.remove(&stacks[0].id).unwrap();

    assert!(matches!(
        repo.get_by_id(&stacks[0].id).unwrap_err(),
        RepoError::NotFound(_)
    ));
    // The freed name can be reused.
    repo.create(&create_stack("replacement", &stacks[0].name))
        .unwrap();
}

fn check_remove_missing_is_noop<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);

    repo.remove("non-existing").unwrap();

    let all = repo.search_stacks(&StackSearchQuery::new()).unwrap();
    assert_same_set(&all, &stacks.iter().collect::<Vec<_>>());
}

fn check_remove_blank_is_invalid_argument<R: StackRepository>(repo: &R) {
    let err = repo.remove("").unwrap_err();
    assert!(matches!(err, RepoError::InvalidArgument(_)));
}

fn check_update_replaces_every_field<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);
    let mut stack = stacks[0].clone();

    stack.name = "new-name".to_string();
    stack.creator = "new-creator".to_string();
    stack.description = "new-description".to_string();
    stack.scope = "new-scope".to_string();
    stack.tags.clear();
    stack.tags.push("new-tag".to_string());

    stack.components.remove(1);
    stack
        .components
        .push(StackComponent::new("component3", "component3-version"));
    stack.components[0].name = "new-name".to_string();
    stack.components[0].version = "new-version".to_string();

    stack.source.kind = "new-type".to_string();
    stack.source.origin = "new-source".to_string();

    stack.icon = Some(StackIcon::new("new-name", "new-media", b"new-data".to_vec()));

    stack.acl.remove(1);
    let user = stack.acl[0].user.clone();
    stack.acl.push(AclEntry::new(user, ["action3", "action4"]));
    stack.acl[0].actions.push("new-action".to_string());

    stack.public_actions.push("new-public-action".to_string());
    stack.workspace_config = WorkspaceConfig::new(json!({ "name": "renamed", "projects": [1, 2] }));

    repo.update(&stack).unwrap();

    assert_eq!(repo.get_by_id(&stack.id).unwrap(), stack);
    assert_eq!(repo.get_by_id(&stacks[1].id).unwrap(), stacks[1]);
}

fn check_update_can_drop_icon_and_lists<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);
    let mut stack = stacks[2].clone();
    stack.icon = None;
    stack.tags.clear();
    stack.components.clear();
    stack.acl.clear();
    stack.public_actions.clear();

    repo.update(&stack).unwrap();

    assert_eq!(repo.get_by_id(&stack.id).unwrap(), stack);
}

fn check_update_to_reserved_name_conflicts<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);
    let mut stack = stacks[0].clone();
    stack.name = stacks[1].name.clone();
    stack.description = "should not be stored".to_string();

    let err = repo.update(&stack).unwrap_err();
    assert!(matches!(
        err,
        RepoError::AlreadyExists {
            field: UniqueField::Name,
            ..
        }
    ));
    assert_eq!(repo.get_by_id(&stacks[0].id).unwrap(), stacks[0]);
}

fn check_update_keeping_own_name_succeeds<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);
    let mut stack = stacks[3].clone();
    stack.description = "same name, new description".to_string();

    repo.update(&stack).unwrap();

    assert_eq!(repo.get_by_id(&stack.id).unwrap(), stack);
}

fn check_update_missing_is_not_found<R: StackRepository>(repo: &R) {
    seed_stacks(repo);

    let err = repo
        .update(&create_stack("new-stack", "new-stack-name"))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == "new-stack"));
}

fn check_update_blank_is_invalid_argument<R: StackRepository>(repo: &R) {
    let err = repo.update(&create_stack("", "name")).unwrap_err();
    assert!(matches!(err, RepoError::InvalidArgument(_)));
}

fn check_returned_stack_is_independent_copy<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);

    let mut loaded = repo.get_by_id(&stacks[0].id).unwrap();
    loaded.tags.push("local-only".to_string());
    loaded.acl[0].actions.push("search".to_string());

    assert_eq!(repo.get_by_id(&stacks[0].id).unwrap(), stacks[0]);
}

fn check_search_finds_public_stacks<R: StackRepository>(repo: &R) {
    let mut stacks = seed_stacks(repo);
    for i in [0, 2, 4] {
        stacks[i].public_actions.clear();
        repo.update(&stacks[i]).unwrap();
    }

    let found = repo
        .search_stacks(&StackSearchQuery::new().page(0, 100))
        .unwrap();

    assert_same_set(&found, &[&stacks[1], &stacks[3]]);
}

fn check_search_finds_stacks_granted_to_user<R: StackRepository>(repo: &R) {
    let mut stacks = seed_stacks(repo);
    let user_id = stacks[0].acl[0].user.clone();
    for stack in stacks.iter_mut() {
        stack.public_actions.clear();
    }
    stacks[1].acl = vec![AclEntry::new(user_id.clone(), ["search"])];
    stacks[3].acl = vec![AclEntry::new(user_id.clone(), ["search"])];
    for stack in &stacks {
        repo.update(stack).unwrap();
    }

    let found = repo
        .search_stacks(&StackSearchQuery::for_user(user_id.as_str()))
        .unwrap();
    assert_same_set(&found, &[&stacks[1], &stacks[3]]);

    let anonymous = repo.search_stacks(&StackSearchQuery::new()).unwrap();
    assert!(anonymous.is_empty());

    let stranger = repo
        .search_stacks(&StackSearchQuery::for_user("stranger"))
        .unwrap();
    assert!(stranger.is_empty());
}

fn check_search_filters_by_tag_superset<R: StackRepository>(repo: &R) {
    let mut stacks = seed_stacks(repo);
    stacks[0].tags.extend(["search-tag1", "search-tag2"].map(String::from));
    stacks[1].tags.extend(["search-tag1", "non-search-tag"].map(String::from));
    stacks[2].tags.extend(["non-search-tag", "search-tag2"].map(String::from));
    stacks[3]
        .tags
        .extend(["search-tag1", "search-tag2", "another-tag"].map(String::from));
    for stack in &stacks {
        repo.update(stack).unwrap();
    }

    let found = repo
        .search_stacks(&StackSearchQuery::new().with_tags(["search-tag2", "search-tag1"]))
        .unwrap();

    assert_same_set(&found, &[&stacks[0], &stacks[3]]);
}

fn check_search_mixes_public_and_acl_visibility<R: StackRepository>(repo: &R) {
    let mut public = create_stack("a", "stack-a");
    public.public_actions = vec!["search".to_string()];
    public.tags = vec!["t1".to_string(), "t2".to_string(), "t3".to_string()];

    let mut granted = create_stack("b", "stack-b");
    granted.public_actions = vec!["read".to_string()];
    granted.acl = vec![AclEntry::new("u", ["read", "search"])];
    granted.tags = vec!["t1".to_string(), "t2".to_string()];

    let mut hidden = create_stack("c", "stack-c");
    hidden.public_actions.clear();
    hidden.acl = vec![AclEntry::new("u", ["read"])];

    for stack in [&public, &granted, &hidden] {
        repo.create(stack).unwrap();
    }

    let anonymous = repo
        .search_stacks(&StackSearchQuery::new().page(0, 100))
        .unwrap();
    assert_same_set(&anonymous, &[&public]);

    let for_user = repo.search_stacks(&StackSearchQuery::for_user("u")).unwrap();
    assert_same_set(&for_user, &[&public, &granted]);

    let tagged = repo
        .search_stacks(&StackSearchQuery::new().with_tags(["t1", "t2"]))
        .unwrap();
    assert_same_set(&tagged, &[&public]);

    let tagged_for_user = repo
        .search_stacks(&StackSearchQuery::for_user("u").with_tags(["t3"]))
        .unwrap();
    assert_same_set(&tagged_for_user, &[&public]);
}

fn check_search_pagination_is_stable_and_disjoint<R: StackRepository>(repo: &R) {
    let stacks = seed_stacks(repo);

    let first = repo
        .search_stacks(&StackSearchQuery::new().page(0, 2))
        .unwrap();
    let second = repo
        .search_stacks(&StackSearchQuery::new().page(2, 2))
        .unwrap();
    let third = repo
        .search_stacks(&StackSearchQuery::new().page(4, 2))
        .unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(third.len(), 1);
    assert!(ids(&first).is_disjoint(&ids(&second)));

    let mut all_ids = ids(&first);
    all_ids.extend(ids(&second));
    all_ids.extend(ids(&third));
    assert_eq!(all_ids, ids(&stacks));

    let again = repo
        .search_stacks(&StackSearchQuery::new().page(2, 2))
        .unwrap();
    assert_eq!(again, second);

    let rest = repo
        .search_stacks(&StackSearchQuery::new().page(2, 0))
        .unwrap();
    assert_eq!(rest.len(), 3);
    assert_eq!(rest[..2], second[..]);

    let beyond = repo
        .search_stacks(&StackSearchQuery::new().page(10, 0))
        .unwrap();
    assert!(beyond.is_empty());
}

macro_rules! contract_tests {
    ($backend:ident, $make_repo:expr) => {
        mod $backend {
            use super::*;

            #[test]
            fn get_by_id_returns_stored_stack() {
                check_get_by_id_returns_stored_stack(&$make_repo);
            }

            #[test]
            fn get_by_id_missing_is_not_found() {
                check_get_by_id_missing_is_not_found(&$make_repo);
            }

            #[test]
            fn get_by_id_blank_is_invalid_argument() {
                check_get_by_id_blank_is_invalid_argument(&$make_repo);
            }

            #[test]
            fn create_roundtrips_every_field() {
                check_create_roundtrips_every_field(&$make_repo);
            }

            #[test]
            fn create_without_icon_roundtrips() {
                check_create_without_icon_roundtrips(&$make_repo);
            }

            #[test]
            fn create_duplicate_id_conflicts() {
                check_create_duplicate_id_conflicts(&$make_repo);
            }

            #[test]
            fn create_duplicate_name_conflicts() {
                check_create_duplicate_name_conflicts(&$make_repo);
            }

            #[test]
            fn create_blank_is_invalid_argument() {
                check_create_blank_is_invalid_argument(&$make_repo);
            }

            #[test]
            fn remove_then_get_is_not_found() {
                check_remove_then_get_is_not_found(&$make_repo);
            }

            #[test]
            fn remove_missing_is_noop() {
                check_remove_missing_is_noop(&$make_repo);
            }

            #[test]
            fn remove_blank_is_invalid_argument() {
                check_remove_blank_is_invalid_argument(&$make_repo);
            }

            #[test]
            fn update_replaces_every_field() {
                check_update_replaces_every_field(&$make_repo);
            }

            #[test]
            fn update_can_drop_icon_and_lists() {
                check_update_can_drop_icon_and_lists(&$make_repo);
            }

            #[test]
            fn update_to_reserved_name_conflicts() {
                check_update_to_reserved_name_conflicts(&$make_repo);
            }

            #[test]
            fn update_keeping_own_name_succeeds() {
                check_update_keeping_own_name_succeeds(&$make_repo);
            }

            #[test]
            fn update_missing_is_not_found() {
                check_update_missing_is_not_found(&$make_repo);
            }

            #[test]
            fn update_blank_is_invalid_argument() {
                check_update_blank_is_invalid_argument(&$make_repo);
            }

            #[test]
            fn returned_stack_is_independent_copy() {
                check_returned_stack_is_independent_copy(&$make_repo);
            }

            #[test]
            fn search_finds_public_stacks() {
                check_search_finds_public_stacks(&$make_repo);
            }

            #[test]
            fn search_finds_stacks_granted_to_user() {
                check_search_finds_stacks_granted_to_user(&$make_repo);
            }

            #[test]
            fn search_filters_by_tag_superset() {
                check_search_filters_by_tag_superset(&$make_repo);
            }

            #[test]
            fn search_mixes_public_and_acl_visibility() {
                check_search_mixes_public_and_acl_visibility(&$make_repo);
            }

            #[test]
            fn search_pagination_is_stable_and_disjoint() {
                check_search_pagination_is_stable_and_disjoint(&$make_repo);
            }
        }
    };
}

contract_tests!(sqlite, SqliteStackRepository::open_in_memory().unwrap());
contract_tests!(memory, MemoryStackRepository::new());
