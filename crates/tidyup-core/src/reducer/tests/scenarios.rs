use super::*;
use pretty_assertions::assert_eq;

#[test]
fn moving_into_a_new_tree_creates_each_level() {
    let plan = PlanState::build(&notes_snapshot(), &archive_proposals());

    assert_eq!(
        plan.items,
        vec![
            item("a.txt", ItemKind::Keep, "a.txt"),
            item("", ItemKind::Create, "archive/"),
            item("", ItemKind::Create, "archive/2024/"),
            item("notes/b.txt", ItemKind::Move, "archive/2024/b.txt"),
            item("notes/", ItemKind::Keep, "notes/"),
        ]
    );
    assert_eq!(plan.max_depth, 2);
}

#[test]
fn rejecting_a_move_keeps_the_file_and_toggling_back_restores_it() {
    let mut state = ready_state(notes_snapshot(), archive_proposals());
    assert_eq!(state.plan.items[3].kind, ItemKind::Move);

    let effects = user(&mut state, UserAction::ToggleItem(3));
    assert!(matches!(effects.as_slice(), [ReviewEffect::RequestFrame]));
    assert_eq!(
        state.plan.items[state.selected],
        ReviewItem {
            source: "notes/b.txt".to_string(),
            kind: ItemKind::Keep,
            target: "notes/b.txt".to_string(),
            rejected: true,
        }
    );
    assert_eq!(state.selected, 4);
    assert_eq!(
        state.plan.rejection_overrides.get("notes/b.txt"),
        Some(&ProposedAction::move_to("notes/b.txt", "archive/2024/b.txt"))
    );

    let selected = state.selected;
    user(&mut state, UserAction::ToggleItem(selected));
    assert_eq!(state.selected, 3);
    assert_eq!(
        state.plan.items[3],
        item("notes/b.txt", ItemKind::Move, "archive/2024/b.txt")
    );
    assert!(state.plan.rejection_overrides.is_empty());
}

#[test]
fn rejecting_a_new_directory_keeps_its_place() {
    let mut state = ready_state(notes_snapshot(), archive_proposals());

    user(&mut state, UserAction::ToggleItem(1));
    assert_eq!(state.selected, 1);
    assert_eq!(state.plan.items[1].kind, ItemKind::RejectedCreate);
    assert_eq!(state.plan.items[1].target, "archive/");
    assert!(state.plan.items[1].rejected);

    user(&mut state, UserAction::ToggleItem(1));
    assert_eq!(state.plan.items[1], item("", ItemKind::Create, "archive/"));
}

#[test]
fn rejecting_a_placeholder_keeps_it_as_is() {
    let mut state = ready_state(notes_snapshot(), archive_proposals());

    user(&mut state, UserAction::ToggleItem(0));
    assert_eq!(state.plan.items[0].kind, ItemKind::Keep);
    assert!(state.plan.items[0].rejected);

    user(&mut state, UserAction::ToggleItem(0));
    assert_eq!(state.plan.items[0], item("a.txt", ItemKind::Keep, "a.txt"));
}

#[test]
fn toggle_past_the_end_is_ignored() {
    let mut state = ready_state(notes_snapshot(), archive_proposals());
    let before = state.plan.clone();

    let effects = user(&mut state, UserAction::ToggleItem(99));
    assert!(effects.is_empty());
    assert_eq!(state.plan, before);
}

#[test]
fn proposals_for_unknown_entries_are_dropped() {
    let plan = PlanState::build(
        &notes_snapshot(),
        &[
            ProposedAction::move_to("ghost.txt", "spooky/ghost.txt"),
            ProposedAction::create("empty/"),
        ],
    );

    assert_eq!(
        targets(&plan),
        vec!["a.txt", "empty/", "notes/", "notes/b.txt"]
    );
    assert!(plan.items.iter().all(|item| item.source != "ghost.txt"));
}

#[test]
fn creating_an_existing_directory_keeps_it() {
    let plan = PlanState::build(&notes_snapshot(), &[ProposedAction::create("notes/")]);

    assert_eq!(
        plan.items,
        vec![
            item("a.txt", ItemKind::Keep, "a.txt"),
            item("notes/", ItemKind::Keep, "notes/"),
            item("notes/b.txt", ItemKind::Keep, "notes/b.txt"),
        ]
    );
}

#[test]
fn directory_moves_match_with_or_without_separator() {
    let plan = PlanState::build(
        &notes_snapshot(),
        &[ProposedAction::move_to("notes", "old/notes")],
    );

    assert!(plan
        .items
        .contains(&item("notes/", ItemKind::Move, "old/notes")));
}

#[test]
fn placeholder_plan_keeps_everything() {
    let plan = PlanState::from_snapshot(&notes_snapshot());

    assert_eq!(targets(&plan), vec!["a.txt", "notes/", "notes/b.txt"]);
    assert!(plan.items.iter().all(|item| item.kind == ItemKind::Keep));
    assert_eq!(plan.max_depth, 1);
}

#[test]
fn toggle_hands_back_the_flipped_item() {
    let mut plan = PlanState::build(&notes_snapshot(), &archive_proposals());

    let (position, flipped) = plan.toggle(3).expect("item exists");
    assert_eq!(position, 4);
    assert_eq!(
        flipped,
        &ReviewItem {
            source: "notes/b.txt".to_string(),
            kind: ItemKind::Keep,
            target: "notes/b.txt".to_string(),
            rejected: true,
        }
    );

    let (position, restored) = plan.toggle(4).expect("item exists");
    assert_eq!(position, 3);
    assert_eq!(restored, &item("notes/b.txt", ItemKind::Move, "archive/2024/b.txt"));

    assert!(plan.toggle(plan.items.len()).is_none());
}
