//! Ledger service: the durable handle hosts hold on to.
//!
//! Wraps a [`MessageLedger`] and an [`EventStore`]. Every accepted post is
//! decided by the aggregate, appended to the store with an exact expected
//! version, and only then applied in memory. A failed append therefore leaves
//! the in-memory ledger exactly as it was.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use guestbook_core::{AccountId, Aggregate, AggregateRoot, DomainError, ExpectedVersion, LedgerId};
use guestbook_ledger::{LedgerEvent, Message, MessageLedger, PostError, PostMessage};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The message failed validation; nothing was written.
    #[error(transparent)]
    Rejected(#[from] PostError),

    #[error("ledger {0} not found")]
    NotFound(LedgerId),

    #[error("ledger {0} already exists")]
    AlreadyExists(LedgerId),

    /// Stored history could not be turned back into a ledger.
    #[error("ledger history is invalid: {0}")]
    History(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

#[derive(Debug)]
pub struct LedgerService<S> {
    store: S,
    ledger: MessageLedger,
}

impl<S> LedgerService<S>
where
    S: EventStore,
{
    /// Create a new ledger and persist its creation event.
    ///
    /// Fails with `AlreadyExists` if the stream already has history.
    pub fn create(
        store: S,
        ledger_id: LedgerId,
        owner: AccountId,
        now: DateTime<Utc>,
    ) -> Result<Self, ServiceError> {
        let ledger = MessageLedger::new(ledger_id, owner, now);
        let created =
            UncommittedEvent::from_typed(ledger_id, Uuid::now_v7(), &ledger.creation_event())?;

        match store.append(vec![created], ExpectedVersion::NoStream) {
            Ok(_) => {}
            Err(EventStoreError::Concurrency(_)) => {
                return Err(ServiceError::AlreadyExists(ledger_id));
            }
            Err(e) => return Err(e.into()),
        }

        info!(%ledger_id, owner = %ledger.owner(), "ledger created");
        Ok(Self { store, ledger })
    }

    /// Rehydrate an existing ledger from its stream.
    pub fn open(store: S, ledger_id: LedgerId) -> Result<Self, ServiceError> {
        let history = store.load_stream(ledger_id)?;
        if history.is_empty() {
            return Err(ServiceError::NotFound(ledger_id));
        }
        validate_loaded_stream(ledger_id, &history)?;

        let events = history
            .iter()
            .map(StoredEvent::decode::<LedgerEvent>)
            .collect::<Result<Vec<_>, _>>()?;
        let ledger = MessageLedger::rehydrate(&events)?;

        debug!(%ledger_id, messages = ledger.len(), "ledger rehydrated");
        Ok(Self { store, ledger })
    }

    /// Validate, persist and apply a message from `caller`.
    pub fn post(
        &mut self,
        caller: AccountId,
        text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let ledger_id = self.ledger.id_typed();
        let command = PostMessage {
            author: caller,
            text: text.into(),
            now,
        };

        let decided = match self.ledger.handle(&command) {
            Ok(events) => events,
            Err(err) => {
                warn!(%ledger_id, author = %command.author, error = %err, "post rejected");
                return Err(err.into());
            }
        };

        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(ledger_id, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let expected = ExpectedVersion::Exact(self.ledger.version());
        self.store.append(uncommitted, expected)?;

        for event in &decided {
            if let LedgerEvent::MessagePosted(e) = event {
                if e.posted_at > now {
                    warn!(%ledger_id, clock = %now, posted_at = %e.posted_at, "host clock went backwards; timestamp clamped");
                }
            }
            self.ledger.apply(event);
        }

        info!(%ledger_id, author = %command.author, messages = self.ledger.len(), "message posted");
        Ok(())
    }

    /// The last `min(n, len)` messages, oldest first.
    pub fn recent(&self, n: usize) -> &[Message] {
        self.ledger.recent(n)
    }
}

impl<S> LedgerService<S> {
    pub fn ledger(&self) -> &MessageLedger {
        &self.ledger
    }

    pub fn owner(&self) -> &AccountId {
        self.ledger.owner()
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }
}

fn validate_loaded_stream(ledger_id: LedgerId, stream: &[StoredEvent]) -> Result<(), ServiceError> {
    // Guard against a backend handing back someone else's stream or a
    // reordered one.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.ledger_id != ledger_id {
            return Err(ServiceError::Store(EventStoreError::Corrupt(format!(
                "loaded stream contains wrong ledger_id at index {idx}"
            ))));
        }
        if e.sequence_number <= last {
            return Err(ServiceError::Store(EventStoreError::Corrupt(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}
