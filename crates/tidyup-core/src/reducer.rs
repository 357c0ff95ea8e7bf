use tracing::debug;

use super::actions::ReviewAction;
use super::actions::RuntimeAction;
use super::actions::UserAction;
use super::listing::render_listing;
use super::plan::PlanState;
use super::state::CycleError;
use super::state::ErrorKind;
use super::state::InFlight;
use super::state::ReviewItem;
use super::state::ReviewPhase;
use super::state::ReviewState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewEffect {
    RequestFrame,
    ReadSnapshot {
        cycle: u64,
        depth: usize,
    },
    RequestPlan {
        cycle: u64,
        listing: String,
        instruction: Option<String>,
    },
    ApplyPlan {
        cycle: u64,
        items: Vec<ReviewItem>,
    },
    Exit,
}

const PROGRESS_STEP: f64 = 0.3;

/// Kicks off the first top-level listing.
pub fn bootstrap(state: &mut ReviewState) -> Vec<ReviewEffect> {
    state.phase = ReviewPhase::Started;
    vec![start_listing(state, 0)]
}

pub fn reduce(state: &mut ReviewState, action: ReviewAction) -> Vec<ReviewEffect> {
    match action {
        ReviewAction::User(user) => reduce_user(state, user),
        ReviewAction::Runtime(runtime) => reduce_runtime(state, runtime),
    }
}

fn reduce_user(state: &mut ReviewState, action: UserAction) -> Vec<ReviewEffect> {
    match action {
        UserAction::Quit => vec![ReviewEffect::Exit],
        UserAction::MoveUp => {
            state.selected = state.selected.saturating_sub(1);
            vec![ReviewEffect::RequestFrame]
        }
        UserAction::MoveDown => {
            let last = state.plan.items.len().saturating_sub(1);
            state.selected = (state.selected + 1).min(last);
            vec![ReviewEffect::RequestFrame]
        }
        UserAction::RequestPlan => {
            if state.phase != ReviewPhase::Started || state.is_editing_instruction() {
                return Vec::new();
            }
            state.phase = ReviewPhase::Waiting;
            state.plan_pending = true;
            let mut effects = Vec::new();
            match state.in_flight {
                Some(_) => {}
                None if state.snapshot.is_some() => effects.extend(start_planning(state)),
                None => effects.push(start_listing(state, 0)),
            }
            effects.push(ReviewEffect::RequestFrame);
            effects
        }
        UserAction::ToggleItem(index) => {
            if state.phase != ReviewPhase::Ready {
                return Vec::new();
            }
            match state.plan.toggle(index) {
                Some((position, item)) => {
                    debug!(
                        position,
                        rejected = item.rejected,
                        destination = %item.target,
                        "item toggled"
                    );
                    state.selected = position;
                    vec![ReviewEffect::RequestFrame]
                }
                None => Vec::new(),
            }
        }
        UserAction::Approve => {
            if state.phase != ReviewPhase::Ready || state.is_busy() {
                return Vec::new();
            }
            state.phase = ReviewPhase::Finished;
            let cycle = take_cycle(state);
            state.in_flight = Some(InFlight::Applying { cycle });
            state.progress = 0.0;
            debug!(cycle, items = state.plan.items.len(), "applying plan");
            vec![
                ReviewEffect::ApplyPlan {
                    cycle,
                    items: state.plan.items.clone(),
                },
                ReviewEffect::RequestFrame,
            ]
        }
        UserAction::Restart => {
            let allowed = match state.phase {
                ReviewPhase::Finished => !state.is_busy(),
                ReviewPhase::Error => true,
                _ => false,
            };
            if !allowed {
                return Vec::new();
            }
            state.error = None;
            state.phase = ReviewPhase::Waiting;
            state.plan_pending = true;
            let depth = state.plan.max_depth;
            vec![start_listing(state, depth), ReviewEffect::RequestFrame]
        }
        UserAction::Relist => {
            if state.phase != ReviewPhase::Started || state.is_busy() {
                return Vec::new();
            }
            vec![start_listing(state, 0), ReviewEffect::RequestFrame]
        }
        UserAction::OpenInstruction => {
            if state.is_editing_instruction() {
                return Vec::new();
            }
            state.instruction_draft = Some(state.instruction.clone().unwrap_or_default());
            vec![ReviewEffect::RequestFrame]
        }
        UserAction::InstructionInput(ch) => {
            if let Some(draft) = state.instruction_draft.as_mut() {
                draft.push(ch);
                return vec![ReviewEffect::RequestFrame];
            }
            Vec::new()
        }
        UserAction::InstructionPaste(text) => {
            if let Some(draft) = state.instruction_draft.as_mut() {
                draft.extend(text.chars().map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch }));
                return vec![ReviewEffect::RequestFrame];
            }
            Vec::new()
        }
        UserAction::InstructionBackspace => {
            if let Some(draft) = state.instruction_draft.as_mut() {
                draft.pop();
                return vec![ReviewEffect::RequestFrame];
            }
            Vec::new()
        }
        UserAction::SubmitInstruction => {
            let Some(draft) = state.instruction_draft.take() else {
                return Vec::new();
            };
            let trimmed = draft.trim();
            state.instruction = (!trimmed.is_empty()).then(|| trimmed.to_string());
            vec![ReviewEffect::RequestFrame]
        }
        UserAction::CancelInstruction => {
            if state.instruction_draft.take().is_some() {
                return vec![ReviewEffect::RequestFrame];
            }
            Vec::new()
        }
    }
}

fn reduce_runtime(state: &mut ReviewState, action: RuntimeAction) -> Vec<ReviewEffect> {
    match action {
        RuntimeAction::Tick => {
            if !state.is_busy() {
                return Vec::new();
            }
            state.progress += PROGRESS_STEP;
            if state.progress >= 1.0 {
                state.progress = 0.0;
            }
            vec![ReviewEffect::RequestFrame]
        }
        RuntimeAction::SnapshotReady { cycle, result } => {
            if !matches!(state.in_flight, Some(InFlight::Listing { cycle: c, .. }) if c == cycle) {
                debug!(cycle, "ignoring stale listing");
                return Vec::new();
            }
            state.in_flight = None;
            match result {
                Ok(snapshot) => {
                    state.activity.append(
                        cycle,
                        format!("Listed {} entries (depth {})", snapshot.len(), snapshot.depth),
                    );
                    state.plan = PlanState::from_snapshot(&snapshot);
                    state.snapshot = Some(snapshot);
                    clamp_selection(state);

                    let mut effects = Vec::new();
                    if state.plan_pending {
                        effects.extend(start_planning(state));
                    }
                    effects.push(ReviewEffect::RequestFrame);
                    effects
                }
                Err(message) => fail(state, ErrorKind::Listing, message, cycle),
            }
        }
        RuntimeAction::PlanReady { cycle, result } => {
            if state.in_flight != Some(InFlight::Planning { cycle }) {
                debug!(cycle, "ignoring stale plan");
                return Vec::new();
            }
            state.in_flight = None;
            match result {
                Ok(proposals) => {
                    let Some(snapshot) = state.snapshot.as_ref() else {
                        return fail(
                            state,
                            ErrorKind::Request,
                            "plan arrived without a listing".to_string(),
                            cycle,
                        );
                    };
                    state.plan = PlanState::build(snapshot, &proposals);
                    state.phase = ReviewPhase::Ready;
                    state.selected = 0;
                    state.progress = 0.0;
                    let counts = state.plan.counts();
                    state.activity.append(
                        cycle,
                        format!(
                            "Received {} proposals: {} moves, {} new directories",
                            proposals.len(),
                            counts.moves,
                            counts.creates
                        ),
                    );
                    vec![ReviewEffect::RequestFrame]
                }
                Err(message) => fail(state, ErrorKind::Request, message, cycle),
            }
        }
        RuntimeAction::ApplyDone { cycle, result } => {
            if state.in_flight != Some(InFlight::Applying { cycle }) {
                debug!(cycle, "ignoring stale apply result");
                return Vec::new();
            }
            state.in_flight = None;
            match result {
                Ok(report) => {
                    state.activity.append(
                        cycle,
                        format!(
                            "Applied: {} created, {} moved, {} untouched",
                            report.created, report.moved, report.skipped
                        ),
                    );
                    state.last_report = Some(report);
                    let depth = state.plan.max_depth;
                    vec![start_listing(state, depth), ReviewEffect::RequestFrame]
                }
                Err(message) => fail(state, ErrorKind::Apply, message, cycle),
            }
        }
    }
}

fn take_cycle(state: &mut ReviewState) -> u64 {
    let cycle = state.next_cycle;
    state.next_cycle += 1;
    cycle
}

fn start_listing(state: &mut ReviewState, depth: usize) -> ReviewEffect {
    let cycle = take_cycle(state);
    state.in_flight = Some(InFlight::Listing { cycle, depth });
    state.progress = 0.0;
    debug!(cycle, depth, "reading directory");
    ReviewEffect::ReadSnapshot { cycle, depth }
}

fn start_planning(state: &mut ReviewState) -> Option<ReviewEffect> {
    let listing = render_listing(state.snapshot.as_ref()?);
    let cycle = take_cycle(state);
    state.plan_pending = false;
    state.in_flight = Some(InFlight::Planning { cycle });
    state.progress = 0.0;
    debug!(cycle, bytes = listing.len(), "requesting plan");
    Some(ReviewEffect::RequestPlan {
        cycle,
        listing,
        instruction: state.instruction.clone(),
    })
}

fn fail(state: &mut ReviewState, kind: ErrorKind, message: String, cycle: u64) -> Vec<ReviewEffect> {
    debug!(cycle, kind = kind.label(), %message, "cycle failed");
    state.activity.append(cycle, format!("{} failed: {message}", kind.label()));
    state.error = Some(CycleError::new(kind, message, cycle));
    state.phase = ReviewPhase::Error;
    state.plan_pending = false;
    state.in_flight = None;
    state.progress = 0.0;
    vec![ReviewEffect::RequestFrame]
}

fn clamp_selection(state: &mut ReviewState) {
    let last = state.plan.items.len().saturating_sub(1);
    state.selected = state.selected.min(last);
}

#[cfg(test)]
mod tests;
