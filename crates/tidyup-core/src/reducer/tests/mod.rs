use chrono::Local;
use chrono::TimeZone;
use pretty_assertions::assert_eq;

pub(super) use super::bootstrap;
pub(super) use super::reduce;
pub(super) use super::ReviewEffect;
pub(super) use crate::actions::ReviewAction;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::listing::render_listing;
pub(super) use crate::plan::PlanState;
pub(super) use crate::reconcile::directory_prefixes;
pub(super) use crate::reconcile::max_depth;
pub(super) use crate::reconcile::reconcile;
pub(super) use crate::state::ActionKind;
pub(super) use crate::state::ActivityLog;
pub(super) use crate::state::ApplyReport;
pub(super) use crate::state::DirectoryEntry;
pub(super) use crate::state::ErrorKind;
pub(super) use crate::state::InFlight;
pub(super) use crate::state::ItemKind;
pub(super) use crate::state::ProposedAction;
pub(super) use crate::state::ReviewItem;
pub(super) use crate::state::ReviewPhase;
pub(super) use crate::state::ReviewState;
pub(super) use crate::state::Snapshot;

mod activity_log;
mod scenarios;

fn state() -> ReviewState {
    ReviewState::new()
}

fn file(path: &str) -> DirectoryEntry {
    entry(path, false, Vec::new())
}

fn dir(path: &str, children: Vec<DirectoryEntry>) -> DirectoryEntry {
    entry(path, true, children)
}

fn entry(path: &str, is_dir: bool, children: Vec<DirectoryEntry>) -> DirectoryEntry {
    DirectoryEntry {
        path: path.to_string(),
        is_dir,
        size: if is_dir { 4096 } else { 42 },
        modified_at: Local
            .with_ymd_and_hms(2024, 1, 15, 9, 30, 0)
            .single()
            .expect("unambiguous time"),
        mode: if is_dir { "drwxr-xr-x" } else { "-rw-r--r--" }.to_string(),
        children,
    }
}

/// `a.txt`, `notes/`, `notes/b.txt`
fn notes_snapshot() -> Snapshot {
    Snapshot::new(
        1,
        vec![
            file("a.txt"),
            dir("notes", vec![file("notes/b.txt")]),
        ],
    )
}

fn archive_proposals() -> Vec<ProposedAction> {
    vec![ProposedAction::move_to("notes/b.txt", "archive/2024/b.txt")]
}

fn user(state: &mut ReviewState, action: UserAction) -> Vec<ReviewEffect> {
    reduce(state, ReviewAction::User(action))
}

fn runtime(state: &mut ReviewState, action: RuntimeAction) -> Vec<ReviewEffect> {
    reduce(state, ReviewAction::Runtime(action))
}

fn in_flight_cycle(state: &ReviewState) -> u64 {
    state.in_flight.map(InFlight::cycle).expect("work in flight")
}

/// Drives a fresh state through listing and planning into review.
fn ready_state(snapshot: Snapshot, proposals: Vec<ProposedAction>) -> ReviewState {
    let mut state = state();
    bootstrap(&mut state);
    let cycle = in_flight_cycle(&state);
    runtime(
        &mut state,
        RuntimeAction::SnapshotReady {
            cycle,
            result: Ok(snapshot),
        },
    );
    user(&mut state, UserAction::RequestPlan);
    let cycle = in_flight_cycle(&state);
    runtime(
        &mut state,
        RuntimeAction::PlanReady {
            cycle,
            result: Ok(proposals),
        },
    );
    assert_eq!(state.phase, ReviewPhase::Ready);
    state
}

fn targets(plan: &PlanState) -> Vec<&str> {
    plan.items.iter().map(|item| item.target.as_str()).collect()
}

fn item(source: &str, kind: ItemKind, target: &str) -> ReviewItem {
    ReviewItem {
        source: source.to_string(),
        kind,
        target: target.to_string(),
        rejected: false,
    }
}
