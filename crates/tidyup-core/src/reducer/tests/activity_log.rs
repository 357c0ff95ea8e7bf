use super::*;
use pretty_assertions::assert_eq;

#[test]
fn activity_seq_is_monotonic() {
    let mut log = ActivityLog::new(10);
    log.append(1, "one");
    log.append(1, "two");
    log.append(2, "three");

    let seqs: Vec<u64> = log.iter().map(|entry| entry.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[test]
fn activity_eviction_is_fifo() {
    let mut log = ActivityLog::new(3);
    for value in ["1", "2", "3", "4", "5"] {
        log.append(1, value);
    }

    let messages: Vec<&str> = log.iter().map(|entry| entry.message.as_str()).collect();
    assert_eq!(messages, vec!["3", "4", "5"]);
}

#[test]
fn cycle_outcomes_are_recorded() {
    let mut state = ready_state(notes_snapshot(), archive_proposals());
    user(&mut state, UserAction::Approve);
    runtime(
        &mut state,
        RuntimeAction::ApplyDone {
            cycle: 3,
            result: Ok(ApplyReport {
                created: 2,
                moved: 1,
                skipped: 2,
            }),
        },
    );

    let messages: Vec<(u64, &str)> = state
        .activity
        .iter()
        .map(|entry| (entry.cycle, entry.message.as_str()))
        .collect();
    assert_eq!(
        messages,
        vec![
            (1, "Listed 3 entries (depth 1)"),
            (2, "Received 1 proposals: 1 moves, 2 new directories"),
            (3, "Applied: 2 created, 1 moved, 2 untouched"),
        ]
    );
}
