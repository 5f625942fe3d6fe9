// Session state for one simulated dial.
//
// A session owns its id, the subscriber number and the append-only input
// history. The text sent on every exchange is the `*`-joined history, so
// the first exchange (the bare dial) always sends an empty string.

use crate::api::{Transport, UssdResponse};
use crate::error::SessionError;
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Id prefix for sessions driven by a human.
pub const INTERACTIVE_PREFIX: &str = "SIM";
/// Id prefix for sessions replaying a scenario.
pub const SCRIPTED_PREFIX: &str = "AUTO";

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque id correlating every request of one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// `<prefix>_<unix seconds>_<random>_<sequence>`. The sequence keeps
    /// ids distinct inside one process even within the same second.
    pub fn generate(prefix: &str) -> Self {
        let ts = chrono::Utc::now().timestamp();
        let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
        let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
        SessionId(format!("{prefix}_{ts}_{suffix}_{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    AwaitingInput,
    Ended,
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    phone_number: String,
    service_code: String,
    history: Vec<String>,
    last_response: Option<UssdResponse>,
    aborted: bool,
}

impl Session {
    pub fn new(prefix: &str, phone_number: &str, service_code: &str) -> Self {
        let id = SessionId::generate(prefix);
        tracing::info!(session_id = %id, phone_number, "session created");
        Session {
            id,
            phone_number: phone_number.to_string(),
            service_code: service_code.to_string(),
            history: Vec::new(),
            last_response: None,
            aborted: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn service_code(&self) -> &str {
        &self.service_code
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn last_response(&self) -> Option<&UssdResponse> {
        self.last_response.as_ref()
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted
    }

    /// Accumulated text: the history joined with `*`.
    pub fn text(&self) -> String {
        self.history.join("*")
    }

    pub fn state(&self) -> SessionState {
        if self.aborted {
            return SessionState::Ended;
        }
        match &self.last_response {
            None => SessionState::NotStarted,
            Some(r) if r.is_terminal() => SessionState::Ended,
            Some(_) => SessionState::AwaitingInput,
        }
    }

    /// The initial exchange with empty text. Allowed exactly once.
    pub fn dial<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
    ) -> Result<&UssdResponse, SessionError> {
        match self.state() {
            SessionState::NotStarted => Ok(self.exchange(transport)),
            SessionState::AwaitingInput => Err(SessionError::AlreadyDialed),
            SessionState::Ended => Err(SessionError::Ended),
        }
    }

    /// Append one token and send the new accumulated text. Empty tokens
    /// and submissions outside `AwaitingInput` never reach the transport
    /// and leave the history untouched.
    pub fn submit<T: Transport + ?Sized>(
        &mut self,
        token: &str,
        transport: &T,
    ) -> Result<&UssdResponse, SessionError> {
        match self.state() {
            SessionState::AwaitingInput => {}
            SessionState::NotStarted => return Err(SessionError::NotDialed),
            SessionState::Ended => return Err(SessionError::Ended),
        }
        if token.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        self.history.push(token.to_string());
        Ok(self.exchange(transport))
    }

    /// Out-of-protocol exit. The server is not told.
    pub fn abort(&mut self) {
        tracing::info!(session_id = %self.id, "session aborted by user");
        self.aborted = true;
    }

    fn exchange<T: Transport + ?Sized>(&mut self, transport: &T) -> &UssdResponse {
        let text = self.text();
        let resp = transport.submit(&text, self.id.as_str(), &self.phone_number);
        if resp.is_terminal() {
            tracing::info!(session_id = %self.id, inputs = self.history.len(), "session ended");
        }
        self.last_response.insert(resp)
    }
}
