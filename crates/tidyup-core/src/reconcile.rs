use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tracing::debug;
use tracing::warn;

use super::state::ActionKind;
use super::state::ProposedAction;

/// Merges untrusted proposals into one conflict-free action per key.
///
/// Proposals are ordered by source first so that collisions resolve the same
/// way regardless of how the advisory ordered its answer; the earliest
/// proposal for a key wins. Destinations are then claimed with every `Keep`
/// going first, since a kept entry already occupies its path. A claim is the
/// target without its trailing separator, so `docs` and `docs/` are one
/// destination, and nothing may be placed under a destination held by a
/// file. Every directory a target lives under ends up targeted by some
/// action, with a `Create` synthesized for the ones nobody asked for.
pub fn reconcile(proposals: &[ProposedAction]) -> BTreeMap<String, ProposedAction> {
    let mut ordered: Vec<ProposedAction> = proposals.iter().filter_map(sanitize).collect();
    ordered.sort_by(|a, b| a.source.cmp(&b.source));

    let mut keys: BTreeSet<String> = BTreeSet::new();
    let mut indexed: Vec<ProposedAction> = Vec::with_capacity(ordered.len());
    for proposal in ordered {
        if !keys.insert(proposal.resolved_key().to_string()) {
            debug!(
                key = %proposal.resolved_key(),
                kind = proposal.kind.label(),
                "dropping proposal for a key already taken"
            );
            continue;
        }
        indexed.push(proposal);
    }
    indexed.sort_by_key(|proposal| proposal.kind != ActionKind::Keep);

    let mut actions: BTreeMap<String, ProposedAction> = BTreeMap::new();
    // claim -> whether the destination ends up a directory
    let mut claimed: BTreeMap<String, bool> = BTreeMap::new();

    for proposal in indexed {
        if let Some(reason) = destination_conflict(&claimed, &proposal) {
            debug!(
                source = %proposal.source,
                destination = %proposal.target,
                reason,
                "dropping proposal"
            );
            continue;
        }
        claimed.insert(claim(&proposal.target).to_string(), holds_directory(&proposal));
        actions.insert(proposal.resolved_key().to_string(), proposal);
    }

    let mut missing: BTreeSet<String> = BTreeSet::new();
    for destination in claimed.keys() {
        for prefix in directory_prefixes(destination) {
            if claimed.contains_key(claim(prefix)) || missing.contains(prefix) {
                continue;
            }
            let held = actions.get(prefix).or_else(|| actions.get(claim(prefix)));
            if let Some(existing) = held {
                warn!(
                    directory = %prefix,
                    kind = existing.kind.label(),
                    "directory is needed as a destination but is also acted on"
                );
                continue;
            }
            missing.insert(prefix.to_string());
        }
    }

    for prefix in missing {
        actions.insert(prefix.clone(), ProposedAction::create(prefix));
    }

    actions
}

fn claim(target: &str) -> &str {
    target.trim_end_matches('/')
}

fn holds_directory(proposal: &ProposedAction) -> bool {
    proposal.target.ends_with('/') || proposal.source.ends_with('/')
}

fn destination_conflict(
    claimed: &BTreeMap<String, bool>,
    proposal: &ProposedAction,
) -> Option<&'static str> {
    let destination = claim(&proposal.target);
    if claimed.contains_key(destination) {
        return Some("destination already taken");
    }
    let under_file = directory_prefixes(destination)
        .any(|prefix| claimed.get(claim(prefix)) == Some(&false));
    if under_file {
        return Some("destination is inside a file");
    }
    if !holds_directory(proposal) {
        let nested = format!("{destination}/");
        let occupied = claimed
            .range(nested.clone()..)
            .next()
            .is_some_and(|(other, _)| other.starts_with(&nested));
        if occupied {
            return Some("destination is needed as a directory");
        }
    }
    None
}

/// Deepest nesting among targets, counted in separators. A trailing
/// separator on a directory does not count.
pub fn max_depth<'a>(actions: impl IntoIterator<Item = &'a ProposedAction>) -> usize {
    actions
        .into_iter()
        .map(|action| action.target.trim_end_matches('/').matches('/').count())
        .max()
        .unwrap_or(0)
}

/// Strict directory prefixes of `target`, shortest first, each ending in `/`.
pub fn directory_prefixes(target: &str) -> impl Iterator<Item = &str> {
    target
        .match_indices('/')
        .map(|(offset, _)| offset)
        .filter(move |offset| offset + 1 < target.len())
        .map(move |offset| &target[..=offset])
}

/// Cleans up one path as written by the advisory. Paths that could escape the
/// snapshot root are refused.
pub fn normalize_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('/') || trimmed.starts_with('\\') || has_drive_prefix(trimmed) {
        return None;
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "" => {}
            "." if segments.is_empty() => {}
            "." | ".." => return None,
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Some(String::new());
    }

    let mut path = segments.join("/");
    if trimmed.ends_with('/') {
        path.push('/');
    }
    Some(path)
}

fn has_drive_prefix(path: &str) -> bool {
    match path.as_bytes() {
        [letter, b':'] => letter.is_ascii_alphabetic(),
        [letter, b':', b'/' | b'\\', ..] => letter.is_ascii_alphabetic(),
        _ => false,
    }
}

fn sanitize(proposal: &ProposedAction) -> Option<ProposedAction> {
    let (Some(source), Some(target)) = (
        normalize_path(&proposal.source),
        normalize_path(&proposal.target),
    ) else {
        warn!(
            source = %proposal.source,
            destination = %proposal.target,
            "dropping proposal with a path outside the directory"
        );
        return None;
    };

    let cleaned = match proposal.kind {
        ActionKind::Create if source.is_empty() && !target.is_empty() => {
            let target = if target.ends_with('/') {
                target
            } else {
                format!("{target}/")
            };
            ProposedAction::create(target)
        }
        ActionKind::Keep if !source.is_empty() => ProposedAction::keep(source),
        ActionKind::Move if !source.is_empty() && source == target => ProposedAction::keep(source),
        ActionKind::Move if !source.is_empty() && !target.is_empty() => {
            ProposedAction::move_to(source, target)
        }
        kind => {
            warn!(
                source = %proposal.source,
                destination = %proposal.target,
                kind = kind.label(),
                "dropping incomplete proposal"
            );
            return None;
        }
    };
    Some(cleaned)
}
