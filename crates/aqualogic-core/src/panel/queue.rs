//! Outbound command queue
//!
//! Frames wait here until the next keep-alive so they land in the gap the
//! controller leaves for keypads. State changes carry the states they expect
//! to produce; after transmission they move to a verification list and come
//! back here if the LEDs have not followed by the time the check is due.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::state::{DeviceState, StateBit};

/// A queued frame and what it should achieve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    /// Encoded key event frame
    pub frame: Vec<u8>,
    /// (state, desired value) pairs; empty for a plain key press
    pub desired_states: Vec<(StateBit, bool)>,
    /// Transmissions left, including the one about to happen
    pub retries: u32,
}

impl PendingCommand {
    /// A single press with nothing to verify
    pub fn key_press(frame: Vec<u8>) -> Self {
        Self {
            frame,
            desired_states: Vec::new(),
            retries: 1,
        }
    }

    /// A press that is verified and retried until `desired_states` hold
    pub fn asserted(frame: Vec<u8>, desired_states: Vec<(StateBit, bool)>, retries: u32) -> Self {
        Self {
            frame,
            desired_states,
            retries,
        }
    }

    fn is_asserted(&self) -> bool {
        !self.desired_states.is_empty()
    }
}

/// Result of a verification pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckSummary {
    /// Commands whose states took effect
    pub confirmed: usize,
    /// Commands sent again
    pub requeued: usize,
    /// Commands that ran out of retries
    pub dropped: usize,
}

#[derive(Debug)]
struct Scheduled {
    due: Instant,
    command: PendingCommand,
}

/// Commands waiting for the bus, and sent commands waiting for verification
#[derive(Debug)]
pub struct CommandQueue {
    outbound: VecDeque<PendingCommand>,
    verifying: Vec<Scheduled>,
    verify_delay: Duration,
}

impl CommandQueue {
    /// Empty queue verifying state changes `verify_delay` after they are sent
    pub fn new(verify_delay: Duration) -> Self {
        Self {
            outbound: VecDeque::new(),
            verifying: Vec::new(),
            verify_delay,
        }
    }

    /// Queue a command behind those already waiting
    pub fn push(&mut self, command: PendingCommand) {
        self.outbound.push_back(command);
    }

    /// Commands waiting to be transmitted
    pub fn len(&self) -> usize {
        self.outbound.len()
    }

    /// True if nothing waits to be transmitted
    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty()
    }

    /// Sent commands whose effect has not been checked yet
    pub fn awaiting_verification(&self) -> usize {
        self.verifying.len()
    }

    /// Drop queued commands and pending verifications
    pub fn clear(&mut self) {
        self.outbound.clear();
        self.verifying.clear();
    }

    /// Value `state` will take once queued commands have gone out, if any
    /// mentions it; the most recently queued command wins
    pub fn pending_value(&self, state: StateBit) -> Option<bool> {
        self.outbound
            .iter()
            .rev()
            .flat_map(|c| c.desired_states.iter())
            .find(|(s, _)| *s == state)
            .map(|(_, enabled)| *enabled)
    }

    /// Value of `state` as it will be once queued commands have gone out,
    /// falling back to what the LEDs last reported
    pub fn resolve(&self, store: &DeviceState, state: StateBit) -> bool {
        self.pending_value(state)
            .unwrap_or_else(|| store.is_set(state))
    }

    /// Take the next frame to transmit. State changes are scheduled for
    /// verification relative to `now`.
    pub fn take_next(&mut self, now: Instant) -> Option<Vec<u8>> {
        let command = self.outbound.pop_front()?;
        if !command.is_asserted() {
            return Some(command.frame);
        }
        let frame = command.frame.clone();
        self.verifying.push(Scheduled {
            due: now + self.verify_delay,
            command,
        });
        Some(frame)
    }

    /// Check every verification that is due at `now` against the store,
    /// re-queueing commands that have not taken effect while budget remains
    pub fn run_checks(&mut self, store: &DeviceState, now: Instant) -> CheckSummary {
        let mut summary = CheckSummary::default();
        if self.verifying.iter().all(|s| s.due > now) {
            return summary;
        }

        let (due, waiting): (Vec<Scheduled>, Vec<Scheduled>) =
            std::mem::take(&mut self.verifying)
                .into_iter()
                .partition(|s| s.due <= now);
        self.verifying = waiting;

        for Scheduled { mut command, .. } in due {
            let converged = command
                .desired_states
                .iter()
                .all(|(state, enabled)| self.resolve(store, *state) == *enabled);

            if converged {
                tracing::debug!("State change successful: {:?}", command.desired_states);
                summary.confirmed += 1;
                continue;
            }

            command.retries = command.retries.saturating_sub(1);
            if command.retries > 0 {
                tracing::info!(
                    "Requeue {:?}, {} attempts left",
                    command.desired_states,
                    command.retries
                );
                self.outbound.push_back(command);
                summary.requeued += 1;
            } else {
                tracing::info!("Giving up on {:?}", command.desired_states);
                summary.dropped += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asserted(state: StateBit, enabled: bool) -> PendingCommand {
        PendingCommand::asserted(vec![0xAA], vec![(state, enabled)], 3)
    }

    #[test]
    fn test_key_press_not_verified() {
        let mut queue = CommandQueue::new(Duration::from_secs(2));
        queue.push(PendingCommand::key_press(vec![1, 2]));
        assert_eq!(queue.take_next(Instant::now()), Some(vec![1, 2]));
        assert_eq!(queue.awaiting_verification(), 0);
        assert_eq!(queue.take_next(Instant::now()), None);
    }

    #[test]
    fn test_pending_value_overlay() {
        let mut queue = CommandQueue::new(Duration::from_secs(2));
        let store = DeviceState::new();
        assert!(!queue.resolve(&store, StateBit::Aux1));

        queue.push(asserted(StateBit::Aux1, true));
        assert_eq!(queue.pending_value(StateBit::Aux1), Some(true));
        assert!(queue.resolve(&store, StateBit::Aux1));
        assert_eq!(queue.pending_value(StateBit::Aux2), None);
    }

    #[test]
    fn test_latest_queued_value_wins() {
        let mut queue = CommandQueue::new(Duration::from_secs(2));
        let store = DeviceState::new();
        queue.push(asserted(StateBit::Aux1, true));
        queue.push(asserted(StateBit::Aux1, false));
        assert_eq!(queue.pending_value(StateBit::Aux1), Some(false));
        assert!(!queue.resolve(&store, StateBit::Aux1));
    }

    #[test]
    fn test_check_waits_for_delay() {
        let start = Instant::now();
        let mut queue = CommandQueue::new(Duration::from_secs(2));
        let store = DeviceState::new();
        queue.push(asserted(StateBit::Aux1, true));
        queue.take_next(start);

        let summary = queue.run_checks(&store, start + Duration::from_secs(1));
        assert_eq!(summary, CheckSummary::default());
        assert_eq!(queue.awaiting_verification(), 1);

        let summary = queue.run_checks(&store, start + Duration::from_secs(2));
        assert_eq!(summary.requeued, 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.awaiting_verification(), 0);
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut now = Instant::now();
        let mut queue = CommandQueue::new(Duration::from_secs(2));
        let store = DeviceState::new();
        queue.push(asserted(StateBit::Aux1, true));

        let mut sent = 0;
        while queue.take_next(now).is_some() {
            sent += 1;
            now += Duration::from_secs(3);
            queue.run_checks(&store, now);
        }
        assert_eq!(sent, 3);
        assert!(queue.is_empty());
        assert_eq!(queue.awaiting_verification(), 0);
    }

    #[test]
    fn test_converged_command_dropped() {
        let now = Instant::now();
        let mut queue = CommandQueue::new(Duration::ZERO);
        let mut store = DeviceState::new();
        queue.push(asserted(StateBit::Aux1, true));
        queue.take_next(now);

        store.states.insert(StateBit::Aux1);
        let summary = queue.run_checks(&store, now);
        assert_eq!(summary.confirmed, 1);
        assert!(queue.is_empty());
    }
}
