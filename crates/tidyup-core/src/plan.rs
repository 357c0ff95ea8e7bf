use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tracing::debug;
use tracing::warn;

use super::reconcile::max_depth;
use super::reconcile::normalize_path;
use super::reconcile::reconcile;
use super::state::ActionKind;
use super::state::ItemKind;
use super::state::ProposedAction;
use super::state::ReviewItem;
use super::state::Snapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanState {
    pub items: Vec<ReviewItem>,
    pub max_depth: usize,
    pub rejection_overrides: BTreeMap<String, ProposedAction>,
}

impl PlanState {
    /// Placeholder plan that keeps every listed entry where it is.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut plan = Self {
            items: snapshot.paths().into_iter().map(ReviewItem::keep).collect(),
            max_depth: snapshot.depth,
            rejection_overrides: BTreeMap::new(),
        };
        plan.sort();
        plan
    }

    pub fn build(snapshot: &Snapshot, proposals: &[ProposedAction]) -> Self {
        let entries = snapshot.flatten();
        let known: BTreeSet<String> = entries
            .iter()
            .flat_map(|entry| [entry.path.clone(), entry.display_path()])
            .collect();
        let applicable: Vec<ProposedAction> = proposals
            .iter()
            .filter(|proposal| {
                if proposal.kind == ActionKind::Create {
                    return true;
                }
                let listed = normalize_path(&proposal.source)
                    .is_some_and(|source| known.contains(&source));
                if !listed {
                    warn!(
                        source = %proposal.source,
                        kind = proposal.kind.label(),
                        "dropping proposal for an entry that is not in the listing"
                    );
                }
                listed
            })
            .cloned()
            .collect();

        let actions = reconcile(&applicable);
        let mut items = Vec::new();
        let mut consumed: BTreeSet<&str> = BTreeSet::new();

        for entry in entries {
            let display = entry.display_path();
            let matched = actions
                .get_key_value(display.as_str())
                .or_else(|| actions.get_key_value(entry.path.as_str()));

            let item = match matched {
                Some((key, action)) => {
                    consumed.insert(key.as_str());
                    match action.kind {
                        // The directory is already there.
                        ActionKind::Create => ReviewItem::keep(display),
                        ActionKind::Move | ActionKind::Keep => ReviewItem {
                            source: display,
                            kind: action.kind.into(),
                            target: action.target.clone(),
                            rejected: false,
                        },
                    }
                }
                None => ReviewItem::keep(display),
            };
            items.push(item);
        }

        for (key, action) in &actions {
            if action.kind == ActionKind::Create && !consumed.contains(key.as_str()) {
                items.push(ReviewItem::from_action(action));
            }
        }

        let mut plan = Self {
            items,
            max_depth: max_depth(actions.values()),
            rejection_overrides: BTreeMap::new(),
        };
        plan.sort();
        debug!(
            items = plan.items.len(),
            max_depth = plan.max_depth,
            "plan rebuilt"
        );
        plan
    }

    /// Flips one item between approved and rejected and returns the item
    /// together with where it landed after re-sorting.
    pub fn toggle(&mut self, index: usize) -> Option<(usize, &ReviewItem)> {
        if index >= self.items.len() {
            return None;
        }
        let mut item = self.items.remove(index);

        if item.rejected {
            let restored = self.rejection_overrides.remove(item.override_key());
            match restored {
                Some(action) => {
                    item.kind = action.kind.into();
                    item.target = action.target;
                }
                None if item.is_synthetic() => item.kind = ItemKind::Create,
                None => {
                    item.kind = ItemKind::Keep;
                    item.target = item.source.clone();
                }
            }
            item.rejected = false;
        } else {
            self.rejection_overrides
                .insert(item.override_key().to_string(), item.as_proposal());
            if item.is_synthetic() {
                item.kind = ItemKind::RejectedCreate;
            } else {
                item.kind = ItemKind::Keep;
                item.target = item.source.clone();
            }
            item.rejected = true;
        }

        let position = self
            .items
            .partition_point(|other| other.target <= item.target);
        self.items.insert(position, item);
        Some((position, &self.items[position]))
    }

    pub fn counts(&self) -> PlanCounts {
        let mut counts = PlanCounts::default();
        for item in &self.items {
            match item.kind {
                _ if item.rejected => counts.rejected += 1,
                ItemKind::Move => counts.moves += 1,
                ItemKind::Create => counts.creates += 1,
                ItemKind::Keep | ItemKind::RejectedCreate => counts.keeps += 1,
            }
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn sort(&mut self) {
        self.items.sort_by(|a, b| a.target.cmp(&b.target));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanCounts {
    pub moves: usize,
    pub creates: usize,
    pub keeps: usize,
    pub rejected: usize,
}
