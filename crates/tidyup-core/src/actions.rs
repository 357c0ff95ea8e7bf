use super::state::ApplyReport;
use super::state::ProposedAction;
use super::state::Snapshot;

#[derive(Debug, Clone)]
pub enum ReviewAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    RequestPlan,
    ToggleItem(usize),
    Approve,
    Restart,
    Relist,
    Quit,
    MoveUp,
    MoveDown,
    OpenInstruction,
    InstructionInput(char),
    InstructionBackspace,
    InstructionPaste(String),
    SubmitInstruction,
    CancelInstruction,
}

/// Completions of work the reducer asked for, tagged with the cycle that
/// requested them.
#[derive(Debug, Clone)]
pub enum RuntimeAction {
    SnapshotReady {
        cycle: u64,
        result: Result<Snapshot, String>,
    },
    PlanReady {
        cycle: u64,
        result: Result<Vec<ProposedAction>, String>,
    },
    ApplyDone {
        cycle: u64,
        result: Result<ApplyReport, String>,
    },
    Tick,
}
