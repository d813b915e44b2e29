//! Polling event tailer: renders only newly observed events until the
//! stack reaches a terminal status.
//!
//! The remote service only answers full-history queries, so every poll
//! re-fetches the whole snapshot and diffs it against the previous one.
//! The poll interval is fixed; this loop is human-attended and favors
//! simplicity over backoff.

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use crate::diff::snapshot_delta;
use crate::error::TailError;
use crate::remote::{EventRecord, StackClient};

pub(crate) const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Render one event the way `events` and `tail` print it.
pub(crate) fn render_event(event: &EventRecord) -> String {
    let mut line = format!(
        "{}  {}  {}  {}",
        event.timestamp, event.resource_type, event.logical_resource_id, event.resource_status
    );
    if let Some(reason) = &event.status_reason {
        line.push_str("  ");
        line.push_str(reason);
    }
    line
}

/// `*_COMPLETE` and `*_FAILED` are terminal; `*_IN_PROGRESS` is not.
pub(crate) fn is_terminal_status(status: &str) -> bool {
    status.ends_with("_COMPLETE") || status.ends_with("_FAILED")
}

/// The tail ends on the stack's own terminal event. Either identifier
/// field may carry the stack name, depending on how the service shaped
/// the event.
fn ends_tail(event: &EventRecord, stack: &str) -> bool {
    let id_matches = event.logical_resource_id == stack
        || event.physical_resource_id.as_deref() == Some(stack);
    id_matches && is_terminal_status(&event.resource_status)
}

/// Finite, lazy sequence of newly observed event lines for one stack.
///
/// Each `next` call may block on a remote fetch and on the poll interval.
/// The sequence ends after the stack's terminal event line has been
/// yielded, or with an error when a fetch fails; it is not restartable.
/// One tailer owns its snapshot state exclusively, so independent stacks
/// can be tailed from separate loops without sharing anything.
pub(crate) struct Tailer<'a> {
    client: &'a dyn StackClient,
    stack: String,
    interval: Duration,
    previous: Option<Vec<String>>,
    pending: VecDeque<String>,
    outcome: Option<String>,
    polled: bool,
    done: bool,
}

impl<'a> Tailer<'a> {
    pub(crate) fn new(client: &'a dyn StackClient, stack: impl Into<String>) -> Self {
        Self::with_interval(client, stack, POLL_INTERVAL)
    }

    pub(crate) fn with_interval(
        client: &'a dyn StackClient,
        stack: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            stack: stack.into(),
            interval,
            previous: None,
            pending: VecDeque::new(),
            outcome: None,
            polled: false,
            done: false,
        }
    }

    /// Terminal status that ended the tail, available once the sequence is
    /// exhausted without error.
    pub(crate) fn outcome(&self) -> Option<&str> {
        self.outcome.as_deref()
    }

    /// One fetch-diff-emit cycle. Queues new lines onto `pending` and
    /// flips `done` when the terminal event shows up.
    fn poll(&mut self) -> Result<(), TailError> {
        let events = self.client.describe_events(&self.stack)?;
        let Some(final_event) = events.last() else {
            // Nothing recorded yet; the service is eventually consistent,
            // so keep previous unset and try again.
            return Ok(());
        };
        let lines: Vec<String> = events.iter().map(render_event).collect();
        let (body, final_line) = lines.split_at(lines.len() - 1);

        match &self.previous {
            None => self.pending.extend(body.iter().cloned()),
            Some(previous) => {
                if body != previous.as_slice() {
                    self.pending.extend(snapshot_delta(previous, body));
                }
            }
        }
        self.previous = Some(body.to_vec());

        if ends_tail(final_event, &self.stack) {
            self.pending.push_back(final_line[0].clone());
            self.outcome = Some(final_event.resource_status.clone());
            self.done = true;
        }
        Ok(())
    }
}

impl Iterator for Tailer<'_> {
    type Item = Result<String, TailError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(Ok(line));
            }
            if self.done {
                return None;
            }
            if self.polled {
                thread::sleep(self.interval);
            }
            self.polled = true;
            if let Err(err) = self.poll() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::remote::{DeployRequest, StackDescription};
    use serde_json::Value;
    use std::cell::RefCell;

    /// Replays a scripted sequence of describe-events responses.
    struct ScriptedClient {
        polls: RefCell<VecDeque<Result<Vec<EventRecord>, RemoteError>>>,
    }

    impl ScriptedClient {
        fn new(polls: Vec<Result<Vec<EventRecord>, RemoteError>>) -> Self {
            Self {
                polls: RefCell::new(polls.into()),
            }
        }
    }

    impl StackClient for ScriptedClient {
        fn create_stack(&self, _request: &DeployRequest) -> Result<String, RemoteError> {
            Err(unscripted())
        }

        fn update_stack(&self, _request: &DeployRequest) -> Result<String, RemoteError> {
            Err(unscripted())
        }

        fn delete_stack(&self, _stack: &str) -> Result<(), RemoteError> {
            Err(unscripted())
        }

        fn describe_events(&self, _stack: &str) -> Result<Vec<EventRecord>, RemoteError> {
            self.polls.borrow_mut().pop_front().unwrap_or_else(|| Err(unscripted()))
        }

        fn get_template(&self, _stack: &str) -> Result<Value, RemoteError> {
            Err(unscripted())
        }

        fn describe_stack(&self, _stack: &str) -> Result<StackDescription, RemoteError> {
            Err(unscripted())
        }
    }

    fn unscripted() -> RemoteError {
        RemoteError::ServiceFailure {
            message: "unscripted call".to_string(),
        }
    }

    fn event(timestamp: &str, logical: &str, status: &str) -> EventRecord {
        EventRecord {
            timestamp: timestamp.to_string(),
            logical_resource_id: logical.to_string(),
            resource_type: "AWS::CloudFormation::Stack".to_string(),
            resource_status: status.to_string(),
            physical_resource_id: None,
            status_reason: None,
        }
    }

    fn collect(tailer: &mut Tailer) -> Vec<String> {
        tailer
            .map(|line| line.expect("tail error"))
            .collect()
    }

    #[test]
    fn emits_body_then_deltas_then_terminal_line() {
        let a = event("t1", "bucket", "CREATE_IN_PROGRESS");
        let b = event("t2", "bucket", "CREATE_COMPLETE");
        let c = event("t3", "mystack", "CREATE_COMPLETE");
        let client = ScriptedClient::new(vec![
            Ok(vec![]),
            Ok(vec![a.clone()]),
            Ok(vec![a.clone(), b.clone()]),
            Ok(vec![a.clone(), b.clone(), c.clone()]),
        ]);

        let mut tailer = Tailer::with_interval(&client, "mystack", Duration::ZERO);
        let lines = collect(&mut tailer);
        assert_eq!(
            lines,
            vec![render_event(&a), render_event(&b), render_event(&c)]
        );
        assert_eq!(tailer.outcome(), Some("CREATE_COMPLETE"));
    }

    #[test]
    fn in_progress_final_line_is_held_back_until_it_joins_the_body() {
        let a = event("t1", "bucket", "CREATE_IN_PROGRESS");
        let b = event("t2", "mystack", "CREATE_IN_PROGRESS");
        let c = event("t3", "mystack", "CREATE_FAILED");
        let client = ScriptedClient::new(vec![
            Ok(vec![a.clone(), b.clone()]),
            Ok(vec![a.clone(), b.clone(), c.clone()]),
        ]);

        let mut tailer = Tailer::with_interval(&client, "mystack", Duration::ZERO);
        let lines = collect(&mut tailer);
        // First poll emits only the body ([a]); b is the final line and not
        // yet terminal, so it waits for the second poll's delta.
        assert_eq!(
            lines,
            vec![render_event(&a), render_event(&b), render_event(&c)]
        );
        assert_eq!(tailer.outcome(), Some("CREATE_FAILED"));
    }

    #[test]
    fn terminal_match_on_physical_id() {
        let mut terminal = event("t1", "root", "DELETE_COMPLETE");
        terminal.physical_resource_id = Some("mystack".to_string());
        let client = ScriptedClient::new(vec![Ok(vec![terminal.clone()])]);

        let mut tailer = Tailer::with_interval(&client, "mystack", Duration::ZERO);
        let lines = collect(&mut tailer);
        assert_eq!(lines, vec![render_event(&terminal)]);
        assert_eq!(tailer.outcome(), Some("DELETE_COMPLETE"));
    }

    #[test]
    fn fetch_failure_ends_the_tail() {
        let a = event("t1", "bucket", "DELETE_IN_PROGRESS");
        let b = event("t2", "other", "DELETE_COMPLETE");
        let client = ScriptedClient::new(vec![
            Ok(vec![a.clone(), b.clone()]),
            Err(RemoteError::NotFound {
                stack: "mystack".to_string(),
                message: "gone".to_string(),
            }),
        ]);

        let mut tailer = Tailer::with_interval(&client, "mystack", Duration::ZERO);
        assert_eq!(tailer.next().expect("line").expect("ok line"), render_event(&a));
        let err = tailer.next().expect("error item").unwrap_err();
        assert!(err.is_not_found());
        assert!(tailer.next().is_none());
        assert_eq!(tailer.outcome(), None);
    }

    #[test]
    fn reordered_snapshot_does_not_reprint_seen_lines() {
        let a = event("t1", "bucket", "CREATE_IN_PROGRESS");
        let b = event("t1", "queue", "CREATE_IN_PROGRESS");
        let c = event("t2", "mystack", "CREATE_COMPLETE");
        let client = ScriptedClient::new(vec![
            Ok(vec![a.clone(), b.clone(), c.clone()]),
        ]);

        // Single poll: body emitted once, terminal line ends the loop even
        // though a and b share a timestamp.
        let mut tailer = Tailer::with_interval(&client, "mystack", Duration::ZERO);
        let lines = collect(&mut tailer);
        assert_eq!(
            lines,
            vec![render_event(&a), render_event(&b), render_event(&c)]
        );
    }

    #[test]
    fn empty_snapshots_emit_nothing_and_keep_previous_unset() {
        let terminal = event("t1", "mystack", "CREATE_COMPLETE");
        let client = ScriptedClient::new(vec![
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![terminal.clone()]),
        ]);

        let mut tailer = Tailer::with_interval(&client, "mystack", Duration::ZERO);
        let lines = collect(&mut tailer);
        assert_eq!(lines, vec![render_event(&terminal)]);
    }
}
