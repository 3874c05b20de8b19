//! Pure connection state machine.
//!
//! This models the state transitions the imperative connect/auth/execute
//! code in this crate walks through, as a synchronously-testable value
//! type: feed it an `Event`, get back the next `ConnectionState` plus the
//! `Action`(s) a driver loop should take. No I/O happens here.
//!
//! Rust's move semantics make the classic `Modifying` sentinel state (used
//! in GC'd languages to avoid observing a half-updated enum during a
//! transition) unnecessary: `step` takes `self` by value and returns a
//! fresh state, so there's never a window where the old state is visible
//! half-mutated.

use std::collections::VecDeque;

/// Where the connection is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Initialized,
    ConnectMessageSent,
    ProtocolMessageSent,
    DataTypesMessageSent,
    WaitingToStartAuthentication,
    Authenticating(AuthSubState),
    ReadyForStatement,
    ExecutingStatement(StatementSubState),
    LoggingOff,
    Closing,
    Closed,
    Error,
}

/// Authentication sub-machine, active while `ConnectionState::Authenticating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSubState {
    Init,
    Phase1Sent,
    Phase2Sent,
    Authenticated,
    Error,
}

/// Statement sub-machine, active while `ConnectionState::ExecutingStatement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementSubState {
    Executing,
    Fetching,
    Cancelling,
    Quiescing,
}

/// One unit of work queued against a ready connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleTask {
    Execute,
    CursorClose { cursor_id: u32 },
    Ping,
    Commit,
    Rollback,
    CloseTempLob,
    LobOp,
    Logoff,
}

/// A queued task. The state machine only tracks ordering here; the
/// completion side (a `oneshot` sender, in the async driver) is opaque to
/// it and left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSlot {
    pub task: OracleTask,
}

/// Inbound events the driver loop feeds into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected,
    AcceptReceived,
    ProtocolResponseReceived,
    DataTypesResponseReceived,
    AuthContextProvided,
    AuthParameterReceived,
    AuthCompleted,
    AuthFailed,
    Enqueue(QueueSlot),
    StatementCompleted,
    MarkerReceived,
    MarkerEchoReceived,
    Cancel,
    Close,
    ChannelInactive,
}

/// What the driver loop should do in response to a `step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SendConnect,
    SendProtocol,
    SendDataTypes,
    ProvideAuthContext,
    SendAuthPhaseOne,
    SendAuthPhaseTwo,
    Authenticated,
    SendExecute,
    SendFetch,
    SendPing,
    SendCommit,
    SendRollback,
    SendMarker,
    LogoffConnection,
    CloseConnection,
    FailStatement,
    SucceedStatement,
    FireChannelInactive,
    Wait,
}

/// The state machine: current state plus the FIFO of pending tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachine {
    pub state: ConnectionState,
    pub queue: VecDeque<QueueSlot>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Initialized,
            queue: VecDeque::new(),
        }
    }

    /// Advance the machine by one event, returning the action(s) to take.
    /// Never panics on an out-of-order event: anything unexpected for the
    /// current state is reported as a single `Action::FailStatement` (or,
    /// pre-`ReadyForStatement`, transitions to `ConnectionState::Error`)
    /// rather than ignored, since a driver that can silently drop an
    /// unexpected packet hides protocol bugs.
    pub fn step(mut self, event: Event) -> (Self, Vec<Action>) {
        use ConnectionState::*;

        match (&self.state, event) {
            (Initialized, Event::Connected) => {
                self.state = ConnectMessageSent;
                (self, vec![Action::SendConnect])
            }
            (ConnectMessageSent, Event::AcceptReceived) => {
                self.state = ProtocolMessageSent;
                (self, vec![Action::SendProtocol])
            }
            (ProtocolMessageSent, Event::ProtocolResponseReceived) => {
                self.state = DataTypesMessageSent;
                (self, vec![Action::SendDataTypes])
            }
            (DataTypesMessageSent, Event::DataTypesResponseReceived) => {
                self.state = WaitingToStartAuthentication;
                (self, vec![Action::ProvideAuthContext])
            }
            (WaitingToStartAuthentication, Event::AuthContextProvided) => {
                self.state = Authenticating(AuthSubState::Phase1Sent);
                (self, vec![Action::SendAuthPhaseOne])
            }
            (Authenticating(AuthSubState::Phase1Sent), Event::AuthParameterReceived) => {
                self.state = Authenticating(AuthSubState::Phase2Sent);
                (self, vec![Action::SendAuthPhaseTwo])
            }
            (Authenticating(AuthSubState::Phase2Sent), Event::AuthCompleted) => {
                self.state = ReadyForStatement;
                (self, vec![Action::Authenticated])
            }
            (Authenticating(_), Event::AuthFailed) => {
                self.state = Error;
                (self, vec![Action::FailStatement, Action::CloseConnection])
            }

            (ReadyForStatement, Event::Enqueue(slot)) => {
                let action = action_for_task(&slot.task);
                self.state = ExecutingStatement(sub_state_for_task(&slot.task));
                self.queue.push_back(slot);
                (self, vec![action])
            }
            (ExecutingStatement(_), Event::Enqueue(slot)) => {
                // Already busy: queue it, driver pumps the next slot once
                // the active one completes.
                self.queue.push_back(slot);
                (self, vec![Action::Wait])
            }
            (ExecutingStatement(_), Event::StatementCompleted) => {
                self.queue.pop_front();
                if let Some(next) = self.queue.front().cloned() {
                    let action = action_for_task(&next.task);
                    self.state = ExecutingStatement(sub_state_for_task(&next.task));
                    (self, vec![Action::SucceedStatement, action])
                } else {
                    self.state = ReadyForStatement;
                    (self, vec![Action::SucceedStatement])
                }
            }
            (ExecutingStatement(_), Event::MarkerReceived) => {
                self.state = ExecutingStatement(StatementSubState::Cancelling);
                (self, vec![Action::SendMarker])
            }
            (ExecutingStatement(StatementSubState::Cancelling), Event::MarkerEchoReceived) => {
                self.queue.pop_front();
                self.state = ReadyForStatement;
                (self, vec![Action::FailStatement])
            }
            (ExecutingStatement(_), Event::Cancel) => {
                self.state = ExecutingStatement(StatementSubState::Cancelling);
                (self, vec![Action::SendMarker])
            }

            (ExecutingStatement(_), Event::Close) => {
                self.state = ExecutingStatement(StatementSubState::Quiescing);
                (self, vec![Action::Wait])
            }
            (ExecutingStatement(StatementSubState::Quiescing), Event::StatementCompleted) => {
                self.queue.clear();
                self.state = LoggingOff;
                (self, vec![Action::LogoffConnection])
            }
            (ReadyForStatement, Event::Close) => {
                self.state = LoggingOff;
                (self, vec![Action::LogoffConnection])
            }
            (LoggingOff, Event::StatementCompleted) => {
                self.state = Closing;
                (self, vec![Action::CloseConnection])
            }
            (Closing, Event::ChannelInactive) | (_, Event::ChannelInactive) => {
                self.state = Closed;
                (self, vec![Action::FireChannelInactive])
            }
            // Closing an already-closing/closed connection is a no-op,
            // matching the idempotent-close requirement.
            (Closing, Event::Close) | (Closed, Event::Close) => (self, vec![Action::Wait]),

            (_, _) => {
                self.state = Error;
                (self, vec![Action::FailStatement])
            }
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn action_for_task(task: &OracleTask) -> Action {
    match task {
        OracleTask::Execute => Action::SendExecute,
        OracleTask::CursorClose { .. } => Action::SendExecute,
        OracleTask::Ping => Action::SendPing,
        OracleTask::Commit => Action::SendCommit,
        OracleTask::Rollback => Action::SendRollback,
        OracleTask::CloseTempLob => Action::SendExecute,
        OracleTask::LobOp => Action::SendExecute,
        OracleTask::Logoff => Action::LogoffConnection,
    }
}

fn sub_state_for_task(task: &OracleTask) -> StatementSubState {
    match task {
        // LOB reads/writes stream chunks back and forth like a fetch loop
        // rather than running to completion in one round trip.
        OracleTask::LobOp => StatementSubState::Fetching,
        _ => StatementSubState::Executing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(mut sm: StateMachine, events: Vec<Event>) -> (StateMachine, Vec<Action>) {
        let mut actions = Vec::new();
        for event in events {
            let (next, mut step_actions) = sm.step(event);
            sm = next;
            actions.append(&mut step_actions);
        }
        (sm, actions)
    }

    #[test]
    fn handshake_walks_through_to_ready_for_statement() {
        let sm = StateMachine::new();
        let (sm, actions) = drive(
            sm,
            vec![
                Event::Connected,
                Event::AcceptReceived,
                Event::ProtocolResponseReceived,
                Event::DataTypesResponseReceived,
                Event::AuthContextProvided,
                Event::AuthParameterReceived,
                Event::AuthCompleted,
            ],
        );
        assert_eq!(sm.state, ConnectionState::ReadyForStatement);
        assert_eq!(
            actions,
            vec![
                Action::SendConnect,
                Action::SendProtocol,
                Action::SendDataTypes,
                Action::ProvideAuthContext,
                Action::SendAuthPhaseOne,
                Action::SendAuthPhaseTwo,
                Action::Authenticated,
            ]
        );
    }

    #[test]
    fn tasks_queue_in_fifo_order() {
        let mut sm = StateMachine::new();
        sm.state = ConnectionState::ReadyForStatement;

        let (sm, _) = sm.step(Event::Enqueue(QueueSlot {
            task: OracleTask::Execute,
        }));
        let (sm, actions) = sm.step(Event::Enqueue(QueueSlot { task: OracleTask::Ping }));
        assert_eq!(actions, vec![Action::Wait]);
        assert_eq!(sm.queue.len(), 2);
        assert_eq!(sm.queue[0].task, OracleTask::Execute);
        assert_eq!(sm.queue[1].task, OracleTask::Ping);

        let (sm, actions) = sm.step(Event::StatementCompleted);
        assert_eq!(actions, vec![Action::SucceedStatement, Action::SendPing]);
        assert_eq!(sm.queue.len(), 1);
    }

    #[test]
    fn marker_mid_statement_triggers_cancellation() {
        let mut sm = StateMachine::new();
        sm.state = ConnectionState::ExecutingStatement(StatementSubState::Executing);
        sm.queue.push_back(QueueSlot {
            task: OracleTask::Execute,
        });

        let (sm, actions) = sm.step(Event::MarkerReceived);
        assert_eq!(actions, vec![Action::SendMarker]);
        assert_eq!(
            sm.state,
            ConnectionState::ExecutingStatement(StatementSubState::Cancelling)
        );

        let (sm, actions) = sm.step(Event::MarkerEchoReceived);
        assert_eq!(actions, vec![Action::FailStatement]);
        assert_eq!(sm.state, ConnectionState::ReadyForStatement);
        assert!(sm.queue.is_empty());
    }

    #[test]
    fn close_while_idle_logs_off_immediately() {
        let mut sm = StateMachine::new();
        sm.state = ConnectionState::ReadyForStatement;

        let (sm, actions) = sm.step(Event::Close);
        assert_eq!(actions, vec![Action::LogoffConnection]);
        assert_eq!(sm.state, ConnectionState::LoggingOff);
    }

    #[test]
    fn close_while_executing_quiesces_before_logoff() {
        let mut sm = StateMachine::new();
        sm.state = ConnectionState::ExecutingStatement(StatementSubState::Executing);
        sm.queue.push_back(QueueSlot {
            task: OracleTask::Execute,
        });

        let (sm, actions) = sm.step(Event::Close);
        assert_eq!(actions, vec![Action::Wait]);
        assert_eq!(
            sm.state,
            ConnectionState::ExecutingStatement(StatementSubState::Quiescing)
        );

        let (sm, actions) = sm.step(Event::StatementCompleted);
        assert_eq!(actions, vec![Action::LogoffConnection]);
        assert_eq!(sm.state, ConnectionState::LoggingOff);
    }

    #[test]
    fn close_is_idempotent_once_closing() {
        let mut sm = StateMachine::new();
        sm.state = ConnectionState::Closing;
        let (sm, actions) = sm.step(Event::Close);
        assert_eq!(actions, vec![Action::Wait]);
        assert_eq!(sm.state, ConnectionState::Closing);
    }

    #[test]
    fn channel_inactive_always_lands_on_closed() {
        let mut sm = StateMachine::new();
        sm.state = ConnectionState::Authenticating(AuthSubState::Phase1Sent);
        let (sm, actions) = sm.step(Event::ChannelInactive);
        assert_eq!(actions, vec![Action::FireChannelInactive]);
        assert_eq!(sm.state, ConnectionState::Closed);
    }
}
