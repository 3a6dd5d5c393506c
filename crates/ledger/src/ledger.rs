use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use guestbook_core::{AccountId, Aggregate, AggregateRoot, DomainError, DomainResult, LedgerId};
use guestbook_events::Event;

use crate::error::PostError;
use crate::message::{Message, validate_text};

/// Aggregate root: the append-only guestbook.
///
/// Every instance is created (has an owner) by construction; there is no
/// half-initialised state to guard against. The owner is recorded but does
/// not gate posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLedger {
    id: LedgerId,
    owner: AccountId,
    created_at: DateTime<Utc>,
    messages: Vec<Message>,
    version: u64,
}

/// Command: PostMessage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMessage {
    pub author: AccountId,
    pub text: String,
    /// Host-supplied current time.
    pub now: DateTime<Utc>,
}

/// Event: LedgerCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCreated {
    pub ledger_id: LedgerId,
    pub owner: AccountId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MessagePosted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePosted {
    pub ledger_id: LedgerId,
    pub author: AccountId,
    pub text: String,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    LedgerCreated(LedgerCreated),
    MessagePosted(MessagePosted),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::LedgerCreated(_) => "guestbook.ledger.created",
            LedgerEvent::MessagePosted(_) => "guestbook.message.posted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::LedgerCreated(e) => e.occurred_at,
            LedgerEvent::MessagePosted(e) => e.posted_at,
        }
    }
}

impl MessageLedger {
    /// Create a ledger owned by `owner`, with no messages.
    pub fn new(ledger_id: LedgerId, owner: AccountId, created_at: DateTime<Utc>) -> Self {
        Self::from_created(&LedgerCreated {
            ledger_id,
            owner,
            occurred_at: created_at,
        })
    }

    fn from_created(event: &LedgerCreated) -> Self {
        Self {
            id: event.ledger_id,
            owner: event.owner.clone(),
            created_at: event.occurred_at,
            messages: Vec::new(),
            version: 1,
        }
    }

    /// The event that brings this ledger into existence (first in its stream).
    pub fn creation_event(&self) -> LedgerEvent {
        LedgerEvent::LedgerCreated(LedgerCreated {
            ledger_id: self.id,
            owner: self.owner.clone(),
            occurred_at: self.created_at,
        })
    }

    /// Rebuild a ledger from its stored history.
    ///
    /// The history must start with `LedgerCreated` and contain it exactly once.
    /// Posted messages are re-checked against the posting rules and clock
    /// order, so a tampered log cannot smuggle in entries `post` would refuse.
    pub fn rehydrate<'a>(events: impl IntoIterator<Item = &'a LedgerEvent>) -> DomainResult<Self> {
        let mut events = events.into_iter();
        let mut ledger = match events.next() {
            Some(LedgerEvent::LedgerCreated(e)) => Self::from_created(e),
            Some(_) => {
                return Err(DomainError::invariant(
                    "ledger history must start with LedgerCreated",
                ));
            }
            None => return Err(DomainError::invariant("ledger history is empty")),
        };

        for event in events {
            match event {
                LedgerEvent::LedgerCreated(_) => {
                    return Err(DomainError::invariant("ledger created more than once"));
                }
                LedgerEvent::MessagePosted(e) => {
                    if e.ledger_id != ledger.id {
                        return Err(DomainError::invariant("ledger_id mismatch"));
                    }
                    validate_text(&e.text).map_err(|err| {
                        DomainError::invariant(format!("stored message is invalid: {err}"))
                    })?;
                    if ledger.last_posted_at().is_some_and(|last| e.posted_at < last) {
                        return Err(DomainError::invariant("posted_at went backwards"));
                    }
                }
            }
            ledger.apply(event);
        }

        Ok(ledger)
    }

    pub fn id_typed(&self) -> LedgerId {
        self.id
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_posted_at(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(|m| m.posted_at)
    }

    /// Validate and append a message from `caller`.
    ///
    /// A rejected post leaves the ledger untouched.
    pub fn post(
        &mut self,
        caller: AccountId,
        text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), PostError> {
        let command = PostMessage {
            author: caller,
            text: text.into(),
            now,
        };
        for event in self.handle(&command)? {
            self.apply(&event);
        }
        Ok(())
    }

    /// The last `min(n, len)` messages, oldest first.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}

impl AggregateRoot for MessageLedger {
    type Id = LedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for MessageLedger {
    type Command = PostMessage;
    type Event = LedgerEvent;
    type Error = PostError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            // Creation is only ever the first event of a stream and is
            // consumed by `from_created`; `rehydrate` rejects repeats.
            LedgerEvent::LedgerCreated(_) => {}
            LedgerEvent::MessagePosted(e) => {
                self.messages.push(Message {
                    author: e.author.clone(),
                    text: e.text.clone(),
                    posted_at: e.posted_at,
                });
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        validate_text(&command.text)?;

        // Never let a host clock step backwards past the newest entry.
        let posted_at = match self.last_posted_at() {
            Some(last) if command.now < last => last,
            _ => command.now,
        };

        Ok(vec![LedgerEvent::MessagePosted(MessagePosted {
            ledger_id: self.id,
            author: command.author.clone(),
            text: command.text.clone(),
            posted_at,
        })])
    }
}
