use std::collections::VecDeque;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Local;
use serde::Deserialize;
use serde::Serialize;

use super::plan::PlanState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified_at: DateTime<Local>,
    pub mode: String,
    pub children: Vec<DirectoryEntry>,
}

impl DirectoryEntry {
    pub fn display_path(&self) -> String {
        if self.is_dir {
            format!("{}/", self.path)
        } else {
            self.path.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub depth: usize,
    pub entries: Vec<DirectoryEntry>,
}

impl Snapshot {
    pub fn new(depth: usize, entries: Vec<DirectoryEntry>) -> Self {
        Self { depth, entries }
    }

    /// Pre-order walk over every entry, parents before their children.
    pub fn flatten(&self) -> Vec<&DirectoryEntry> {
        fn walk<'a>(entries: &'a [DirectoryEntry], out: &mut Vec<&'a DirectoryEntry>) {
            for entry in entries {
                out.push(entry);
                walk(&entry.children, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.entries, &mut out);
        out
    }

    pub fn paths(&self) -> Vec<String> {
        self.flatten()
            .into_iter()
            .map(DirectoryEntry::display_path)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.flatten().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Move,
    Keep,
    Create,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Keep => "keep",
            Self::Create => "create",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedAction {
    pub source: String,
    pub kind: ActionKind,
    pub target: String,
}

impl ProposedAction {
    pub fn new(source: impl Into<String>, kind: ActionKind, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind,
            target: target.into(),
        }
    }

    pub fn move_to(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(source, ActionKind::Move, target)
    }

    pub fn keep(source: impl Into<String>) -> Self {
        let source = source.into();
        let target = source.clone();
        Self::new(source, ActionKind::Keep, target)
    }

    pub fn create(target: impl Into<String>) -> Self {
        Self::new(String::new(), ActionKind::Create, target)
    }

    /// Creates are indexed by the directory they introduce, everything else
    /// by the entry it acts on.
    pub fn resolved_key(&self) -> &str {
        match self.kind {
            ActionKind::Create => &self.target,
            ActionKind::Move | ActionKind::Keep => &self.source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Move,
    Keep,
    Create,
    RejectedCreate,
}

impl From<ActionKind> for ItemKind {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Move => Self::Move,
            ActionKind::Keep => Self::Keep,
            ActionKind::Create => Self::Create,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub source: String,
    pub kind: ItemKind,
    pub target: String,
    pub rejected: bool,
}

impl ReviewItem {
    pub fn keep(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            target: source.clone(),
            source,
            kind: ItemKind::Keep,
            rejected: false,
        }
    }

    pub fn from_action(action: &ProposedAction) -> Self {
        Self {
            source: action.source.clone(),
            kind: action.kind.into(),
            target: action.target.clone(),
            rejected: false,
        }
    }

    /// Directories introduced by the plan have no snapshot entry behind them.
    pub fn is_synthetic(&self) -> bool {
        self.source.is_empty()
    }

    /// Key under which a rejected item remembers what it was before.
    pub fn override_key(&self) -> &str {
        if self.is_synthetic() {
            &self.target
        } else {
            &self.source
        }
    }

    pub fn as_proposal(&self) -> ProposedAction {
        let kind = match self.kind {
            ItemKind::Move => ActionKind::Move,
            ItemKind::Keep => ActionKind::Keep,
            ItemKind::Create | ItemKind::RejectedCreate => ActionKind::Create,
        };
        ProposedAction::new(self.source.clone(), kind, self.target.clone())
    }

    pub fn depth(&self) -> usize {
        self.target.trim_end_matches('/').matches('/').count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewPhase {
    Started,
    Waiting,
    Ready,
    Finished,
    Error,
}

impl ReviewPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Waiting => "Waiting for plan",
            Self::Ready => "Review",
            Self::Finished => "Finished",
            Self::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Listing,
    Request,
    Apply,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Request => "request",
            Self::Apply => "apply",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub kind: ErrorKind,
    pub message: Arc<str>,
    pub cycle: u64,
}

impl CycleError {
    pub fn new(kind: ErrorKind, message: impl Into<Arc<str>>, cycle: u64) -> Self {
        Self {
            kind,
            message: message.into(),
            cycle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFlight {
    Listing { cycle: u64, depth: usize },
    Planning { cycle: u64 },
    Applying { cycle: u64 },
}

impl InFlight {
    pub fn cycle(self) -> u64 {
        match self {
            Self::Listing { cycle, .. } | Self::Planning { cycle } | Self::Applying { cycle } => {
                cycle
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Listing { .. } => "Reading directory",
            Self::Planning { .. } => "Waiting for suggestions",
            Self::Applying { .. } => "Applying plan",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: usize,
    pub moved: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiTheme {
    #[default]
    Classic,
    Mono,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub seq: u64,
    pub cycle: u64,
    pub message: String,
}

/// Bounded history of what happened this session, oldest first.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    cap: usize,
    next_seq: u64,
    buf: VecDeque<ActivityEntry>,
}

impl ActivityLog {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            next_seq: 1,
            buf: VecDeque::with_capacity(cap),
        }
    }

    pub fn append(&mut self, cycle: u64, message: impl Into<String>) {
        let entry = ActivityEntry {
            seq: self.next_seq,
            cycle,
            message: message.into(),
        };
        self.next_seq += 1;

        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.buf.iter()
    }
}

#[derive(Debug, Clone)]
pub struct ReviewState {
    pub phase: ReviewPhase,
    pub snapshot: Option<Snapshot>,
    pub plan: PlanState,
    pub selected: usize,
    pub in_flight: Option<InFlight>,
    pub plan_pending: bool,
    pub next_cycle: u64,
    pub error: Option<CycleError>,
    pub instruction: Option<String>,
    pub instruction_draft: Option<String>,
    pub progress: f64,
    pub last_report: Option<ApplyReport>,
    pub activity: ActivityLog,
}

impl ReviewState {
    pub fn new() -> Self {
        Self {
            phase: ReviewPhase::Started,
            snapshot: None,
            plan: PlanState::default(),
            selected: 0,
            in_flight: None,
            plan_pending: false,
            next_cycle: 1,
            error: None,
            instruction: None,
            instruction_draft: None,
            progress: 0.0,
            last_report: None,
            activity: ActivityLog::new(200),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_editing_instruction(&self) -> bool {
        self.instruction_draft.is_some()
    }
}

impl Default for ReviewState {
    fn default() -> Self {
        Self::new()
    }
}
