//! Method-name call surface for hosts.
//!
//! Hosts invoke the guestbook the way a contract runtime does: a method name,
//! JSON arguments, and an execution context carrying the calling account and
//! the current time. The caller never names itself in the arguments.
//!
//! | method   | args              | result            |
//! |----------|-------------------|-------------------|
//! | `init`   | `{"owner": "…"}`  | `null`            |
//! | `say`    | `{"message": "…"}`| `null`            |
//! | `list`   | none              | last `list_window` messages |
//! | `recent` | `{"n": 5}`        | last `n` messages |

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use guestbook_core::{AccountId, LedgerId};
use guestbook_ledger::{Message, PostError};

use crate::event_store::EventStore;
use crate::service::{LedgerService, ServiceError};

/// Who is calling and when, as established by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub predecessor: AccountId,
    pub timestamp: DateTime<Utc>,
}

impl CallContext {
    pub fn new(predecessor: AccountId, timestamp: DateTime<Utc>) -> Self {
        Self {
            predecessor,
            timestamp,
        }
    }
}

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("contract is not initialized")]
    NotInitialized,

    #[error("contract is already initialized")]
    AlreadyInitialized,

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("invalid arguments for {method}: {reason}")]
    InvalidArgs { method: String, reason: String },

    #[error(transparent)]
    Rejected(PostError),

    #[error(transparent)]
    Service(ServiceError),

    #[error("failed to encode result: {0}")]
    Encode(String),
}

impl From<ServiceError> for ContractError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Rejected(err) => ContractError::Rejected(err),
            ServiceError::AlreadyExists(_) => ContractError::AlreadyInitialized,
            other => ContractError::Service(other),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InitArgs {
    owner: AccountId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SayArgs {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListArgs {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecentArgs {
    n: usize,
}

/// The guestbook as a callable contract bound to one ledger stream.
#[derive(Debug)]
pub struct Contract<S> {
    store: S,
    ledger_id: LedgerId,
    list_window: usize,
    service: Option<LedgerService<S>>,
}

impl<S> Contract<S>
where
    S: EventStore + Clone,
{
    /// Bind to `ledger_id`, picking up existing state if the ledger was
    /// initialized before.
    pub fn load(store: S, ledger_id: LedgerId, list_window: usize) -> Result<Self, ContractError> {
        let service = match LedgerService::open(store.clone(), ledger_id) {
            Ok(service) => Some(service),
            Err(ServiceError::NotFound(_)) => None,
            Err(e) => return Err(ContractError::Service(e)),
        };

        Ok(Self {
            store,
            ledger_id,
            list_window,
            service,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.service.is_some()
    }

    /// Invoke `method` with JSON `args` on behalf of `ctx.predecessor`.
    pub fn call(
        &mut self,
        ctx: &CallContext,
        method: &str,
        args: JsonValue,
    ) -> Result<JsonValue, ContractError> {
        debug!(method, caller = %ctx.predecessor, "contract call");

        match method {
            "init" => {
                let args: InitArgs = parse_args(method, args)?;
                self.init(args.owner, ctx.timestamp)?;
                Ok(JsonValue::Null)
            }
            "say" => {
                let args: SayArgs = parse_args(method, args)?;
                self.service_mut()?
                    .post(ctx.predecessor.clone(), args.message, ctx.timestamp)?;
                Ok(JsonValue::Null)
            }
            "list" => {
                let _: ListArgs = parse_args(method, args)?;
                encode(self.service()?.recent(self.list_window))
            }
            "recent" => {
                let args: RecentArgs = parse_args(method, args)?;
                encode(self.service()?.recent(args.n))
            }
            other => Err(ContractError::UnknownMethod(other.to_string())),
        }
    }

    fn init(&mut self, owner: AccountId, now: DateTime<Utc>) -> Result<(), ContractError> {
        if self.service.is_some() {
            return Err(ContractError::AlreadyInitialized);
        }
        let service = LedgerService::create(self.store.clone(), self.ledger_id, owner, now)?;
        self.service = Some(service);
        Ok(())
    }

    fn service(&self) -> Result<&LedgerService<S>, ContractError> {
        self.service.as_ref().ok_or(ContractError::NotInitialized)
    }

    fn service_mut(&mut self) -> Result<&mut LedgerService<S>, ContractError> {
        self.service.as_mut().ok_or(ContractError::NotInitialized)
    }
}

fn parse_args<T>(method: &str, args: JsonValue) -> Result<T, ContractError>
where
    T: DeserializeOwned,
{
    // Hosts may send no body at all for argument-less methods.
    let args = if args.is_null() {
        JsonValue::Object(Default::default())
    } else {
        args
    };

    serde_json::from_value(args).map_err(|e| ContractError::InvalidArgs {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

fn encode(messages: &[Message]) -> Result<JsonValue, ContractError> {
    serde_json::to_value(messages).map_err(|e| ContractError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::InMemoryEventStore;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx(caller: &str, secs: i64) -> CallContext {
        CallContext::new(
            AccountId::new(caller).unwrap(),
            Utc.timestamp_opt(1_622_755_101 + secs, 0).unwrap(),
        )
    }

    fn fresh_contract() -> Contract<Arc<InMemoryEventStore>> {
        Contract::load(Arc::new(InMemoryEventStore::new()), LedgerId::new(), 10).unwrap()
    }

    #[test]
    fn calls_before_init_fail() {
        let mut contract = fresh_contract();
        assert!(!contract.is_initialized());

        let err = contract
            .call(&ctx("alice", 1), "say", json!({ "message": "hi" }))
            .unwrap_err();
        assert!(matches!(err, ContractError::NotInitialized));

        let err = contract.call(&ctx("alice", 1), "list", JsonValue::Null).unwrap_err();
        assert!(matches!(err, ContractError::NotInitialized));
    }

    #[test]
    fn init_is_once_only() {
        let mut contract = fresh_contract();
        contract
            .call(&ctx("dev-account", 0), "init", json!({ "owner": "ben" }))
            .unwrap();
        assert!(contract.is_initialized());

        let err = contract
            .call(&ctx("dev-account", 1), "init", json!({ "owner": "eve" }))
            .unwrap_err();
        assert!(matches!(err, ContractError::AlreadyInitialized));
    }

    #[test]
    fn say_uses_caller_from_context() {
        let mut contract = fresh_contract();
        contract
            .call(&ctx("dev-account", 0), "init", json!({ "owner": "ben" }))
            .unwrap();

        let err = contract
            .call(&ctx("alice", 1), "say", json!({ "message": "" }))
            .unwrap_err();
        assert!(matches!(err, ContractError::Rejected(PostError::EmptyMessage)));

        let long = "This is a really long message that should throw an error for being longer than 100 characters as is set by the max_length property.";
        let err = contract
            .call(&ctx("alice", 2), "say", json!({ "message": long }))
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::Rejected(PostError::MessageTooLong { .. })
        ));

        contract
            .call(&ctx("alice", 3), "say", json!({ "message": "hello" }))
            .unwrap();

        let listed = contract.call(&ctx("bob", 4), "list", json!({})).unwrap();
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["author"], "alice");
        assert_eq!(listed[0]["text"], "hello");
    }

    #[test]
    fn list_returns_last_window() {
        let mut contract = fresh_contract();
        contract
            .call(&ctx("dev-account", 0), "init", json!({ "owner": "ben" }))
            .unwrap();
        for i in 1..=11 {
            contract
                .call(&ctx("ben", i), "say", json!({ "message": format!("m{i}") }))
                .unwrap();
        }

        let listed = contract.call(&ctx("ben", 20), "list", JsonValue::Null).unwrap();
        let texts: Vec<&str> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["text"].as_str().unwrap())
            .collect();
        let expected: Vec<String> = (2..=11).map(|i| format!("m{i}")).collect();
        assert_eq!(texts, expected);

        let recent = contract
            .call(&ctx("ben", 21), "recent", json!({ "n": 0 }))
            .unwrap();
        assert_eq!(recent, json!([]));
    }

    #[test]
    fn bad_method_and_args_are_reported() {
        let mut contract = fresh_contract();

        let err = contract.call(&ctx("alice", 0), "delete", json!({})).unwrap_err();
        assert!(matches!(err, ContractError::UnknownMethod(m) if m == "delete"));

        let err = contract
            .call(&ctx("alice", 0), "init", json!({ "owner": "" }))
            .unwrap_err();
        assert!(matches!(err, ContractError::InvalidArgs { .. }));

        let err = contract
            .call(&ctx("alice", 0), "recent", json!({ "n": -1 }))
            .unwrap_err();
        assert!(matches!(err, ContractError::InvalidArgs { .. }));
    }

    #[test]
    fn load_picks_up_existing_ledger() {
        let store = Arc::new(InMemoryEventStore::new());
        let ledger_id = LedgerId::new();
        {
            let mut contract = Contract::load(store.clone(), ledger_id, 10).unwrap();
            contract
                .call(&ctx("dev-account", 0), "init", json!({ "owner": "ben" }))
                .unwrap();
            contract
                .call(&ctx("alice", 1), "say", json!({ "message": "persisted" }))
                .unwrap();
        }

        let mut contract = Contract::load(store, ledger_id, 10).unwrap();
        assert!(contract.is_initialized());
        let listed = contract.call(&ctx("bob", 2), "list", JsonValue::Null).unwrap();
        assert_eq!(listed[0]["text"], "persisted");
    }
}
