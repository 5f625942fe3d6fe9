// Control logic for the two ways of driving a session.
//
// The runners know nothing about terminals. The interactive runner talks
// to an `Operator` (a human behind a prompt in the binary, a canned list
// in tests) and the scripted runner reports progress to a
// `ScriptObserver`. Both own exactly one `Session` at a time and make one
// blocking exchange per accepted input.

use crate::api::{Transport, UssdResponse};
use crate::config::{Scenario, SimConfig};
use crate::error::SessionError;
use crate::session::{Session, SessionState, INTERACTIVE_PREFIX, SCRIPTED_PREFIX};
use anyhow::Result;
use std::thread;
use std::time::Duration;

/// One line typed by the operator, already classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorInput {
    /// `q` in any case. Ends the session without telling the server.
    Quit,
    Token(String),
}

impl OperatorInput {
    pub fn parse(raw: &str) -> Self {
        let token = raw.trim();
        if token.eq_ignore_ascii_case("q") {
            OperatorInput::Quit
        } else {
            OperatorInput::Token(token.to_string())
        }
    }
}

/// The human side of an interactive session.
pub trait Operator {
    /// Called once per session before the initial dial.
    fn dialing(&mut self, _session: &Session) -> Result<()> {
        Ok(())
    }

    /// Render the current response and input history.
    fn show(&mut self, session: &Session) -> Result<()>;

    /// Read the next raw line.
    fn next_input(&mut self, session: &Session) -> Result<String>;

    /// The last line was not sent.
    fn rejected(&mut self, error: &SessionError) -> Result<()>;

    /// The session ended on the server side. `true` starts a new one.
    fn offer_restart(&mut self, session: &Session) -> Result<bool>;

    fn aborted(&mut self, _session: &Session) -> Result<()> {
        Ok(())
    }
}

/// How an interactive run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractiveOutcome {
    /// The last session ended on the server and no restart was asked for.
    Finished,
    /// The operator quit mid-session.
    Aborted,
}

pub struct InteractiveRunner<'a, T: Transport + ?Sized> {
    transport: &'a T,
    config: &'a SimConfig,
}

impl<'a, T: Transport + ?Sized> InteractiveRunner<'a, T> {
    pub fn new(transport: &'a T, config: &'a SimConfig) -> Self {
        InteractiveRunner { transport, config }
    }

    /// Run sessions until one ends without a restart or the operator
    /// quits. Restarts loop here instead of recursing.
    pub fn run<O: Operator + ?Sized>(&self, operator: &mut O) -> Result<InteractiveOutcome> {
        loop {
            let mut session = Session::new(
                INTERACTIVE_PREFIX,
                &self.config.phone_number,
                &self.config.service_code,
            );
            operator.dialing(&session)?;
            session.dial(self.transport)?;

            match self.drive(&mut session, operator)? {
                InteractiveOutcome::Aborted => {
                    operator.aborted(&session)?;
                    return Ok(InteractiveOutcome::Aborted);
                }
                InteractiveOutcome::Finished => {
                    if !operator.offer_restart(&session)? {
                        return Ok(InteractiveOutcome::Finished);
                    }
                }
            }
        }
    }

    fn drive<O: Operator + ?Sized>(
        &self,
        session: &mut Session,
        operator: &mut O,
    ) -> Result<InteractiveOutcome> {
        loop {
            operator.show(session)?;
            if session.state() == SessionState::Ended {
                return Ok(InteractiveOutcome::Finished);
            }

            let token = match OperatorInput::parse(&operator.next_input(session)?) {
                OperatorInput::Quit => {
                    session.abort();
                    return Ok(InteractiveOutcome::Aborted);
                }
                OperatorInput::Token(token) => token,
            };

            match session.submit(&token, self.transport) {
                Ok(_) => pause(self.config.input_delay),
                Err(e @ SessionError::EmptyInput) => operator.rejected(&e)?,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Progress hooks for a scripted run.
pub trait ScriptObserver {
    /// Before the initial dial.
    fn started(&mut self, scenario: &Scenario, session: &Session) -> Result<()>;

    /// Before `step` is submitted; `current` is the screen it answers.
    fn step(&mut self, scenario: &Scenario, current: &UssdResponse, step: &str) -> Result<()>;

    fn finished(&mut self, scenario: &Scenario, report: &ScenarioReport) -> Result<()>;
}

/// Result of replaying one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub session_id: String,
    /// Steps actually sent; fewer than the scenario has on early stop.
    pub submitted: Vec<String>,
    pub final_response: UssdResponse,
    /// Every step was sent.
    pub completed: bool,
}

pub struct ScriptedRunner<'a, T: Transport + ?Sized> {
    transport: &'a T,
    config: &'a SimConfig,
}

impl<'a, T: Transport + ?Sized> ScriptedRunner<'a, T> {
    pub fn new(transport: &'a T, config: &'a SimConfig) -> Self {
        ScriptedRunner { transport, config }
    }

    /// Dial, then submit each step in order. A terminal response skips
    /// the remaining steps.
    pub fn run<O: ScriptObserver + ?Sized>(
        &self,
        scenario: &Scenario,
        observer: &mut O,
    ) -> Result<ScenarioReport> {
        let mut session = Session::new(
            SCRIPTED_PREFIX,
            &self.config.phone_number,
            &self.config.service_code,
        );
        observer.started(scenario, &session)?;
        tracing::info!(scenario = %scenario.name, session_id = %session.id(), "running scenario");

        let mut current = session.dial(self.transport)?.clone();
        for step in &scenario.steps {
            if current.is_terminal() {
                tracing::info!(
                    scenario = %scenario.name,
                    skipped = scenario.steps.len() - session.history().len(),
                    "session ended early, skipping remaining steps"
                );
                break;
            }
            observer.step(scenario, &current, step)?;
            pause(self.config.step_delay);
            current = session.submit(step, self.transport)?.clone();
        }

        let report = ScenarioReport {
            session_id: session.id().to_string(),
            submitted: session.history().to_vec(),
            completed: session.history().len() == scenario.steps.len(),
            final_response: current,
        };
        observer.finished(scenario, &report)?;
        Ok(report)
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
