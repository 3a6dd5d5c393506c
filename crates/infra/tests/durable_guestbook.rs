use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use guestbook_core::{AccountId, LedgerId};
use guestbook_infra::event_store::EventStoreError;
use guestbook_infra::{
    CallContext, Contract, ContractError, GuestbookConfig, LedgerService, ServiceError,
    StoreBackend,
};
use guestbook_ledger::PostError;

fn file_config(dir: &std::path::Path) -> GuestbookConfig {
    GuestbookConfig {
        store: StoreBackend::File,
        data_dir: dir.to_path_buf(),
        sync_writes: true,
        ..GuestbookConfig::default()
    }
}

fn ctx(caller: &str, secs: i64) -> anyhow::Result<CallContext> {
    let base = Utc
        .timestamp_opt(1_622_755_101, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("bad base timestamp"))?;
    Ok(CallContext::new(
        AccountId::new(caller)?,
        base + Duration::seconds(secs),
    ))
}

#[test]
fn guestbook_survives_process_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = file_config(dir.path());
    let ledger_id = LedgerId::new();

    {
        let mut contract = Contract::load(config.open_store()?, ledger_id, config.list_window)?;
        contract.call(&ctx("dev-account", 0)?, "init", json!({ "owner": "ben" }))?;
        for i in 1..=11 {
            contract.call(&ctx("alice", i)?, "say", json!({ "message": format!("m{i}") }))?;
        }
    }

    // Fresh store over the same directory, as after a restart.
    let mut contract = Contract::load(config.open_store()?, ledger_id, config.list_window)?;
    assert!(contract.is_initialized());

    let listed = contract.call(&ctx("bob", 30)?, "list", json!(null))?;
    let texts: Vec<String> = serde_json::from_value::<Vec<serde_json::Value>>(listed)?
        .into_iter()
        .map(|m| m["text"].as_str().unwrap_or_default().to_string())
        .collect();
    let expected: Vec<String> = (2..=11).map(|i| format!("m{i}")).collect();
    assert_eq!(texts, expected);

    let all = contract.call(&ctx("bob", 31)?, "recent", json!({ "n": 11 }))?;
    assert_eq!(all.as_array().map(Vec::len), Some(11));
    assert_eq!(all[0]["text"], "m1");
    assert_eq!(all[0]["author"], "alice");

    Ok(())
}

#[test]
fn rejected_posts_are_not_persisted() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = file_config(dir.path());
    let ledger_id = LedgerId::new();

    {
        let mut contract = Contract::load(config.open_store()?, ledger_id, config.list_window)?;
        contract.call(&ctx("dev-account", 0)?, "init", json!({ "owner": "ben" }))?;

        let err = contract
            .call(&ctx("alice", 1)?, "say", json!({ "message": "" }))
            .unwrap_err();
        assert!(matches!(err, ContractError::Rejected(PostError::EmptyMessage)));

        let err = contract
            .call(&ctx("alice", 2)?, "say", json!({ "message": "x".repeat(150) }))
            .unwrap_err();
        assert!(matches!(err, ContractError::Rejected(PostError::MessageTooLong { .. })));

        contract.call(&ctx("alice", 3)?, "say", json!({ "message": "hello" }))?;
    }

    let mut contract = Contract::load(config.open_store()?, ledger_id, config.list_window)?;
    let listed = contract.call(&ctx("bob", 4)?, "list", json!({}))?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["text"], "hello");

    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn guestbook_stays_readable_after_a_failed_write() -> anyhow::Result<()> {
    use std::path::Path;

    if !Path::new("/dev/full").exists() {
        return Ok(());
    }

    let dir = tempfile::tempdir()?;
    let config = file_config(dir.path());
    let ledger_id = LedgerId::new();
    let log = dir.path().join(format!("{ledger_id}.jsonl"));
    let saved = dir.path().join("saved.jsonl");
    let at = |secs: i64| ctx("alice", secs).map(|c| c.timestamp);

    let mut service =
        LedgerService::create(config.open_store()?, ledger_id, AccountId::new("ben")?, at(0)?)?;
    service.post(AccountId::new("alice")?, "before", at(1)?)?;

    // Disk fills up for exactly one post.
    std::fs::rename(&log, &saved)?;
    std::os::unix::fs::symlink("/dev/full", &log)?;
    let err = service
        .post(AccountId::new("alice")?, "lost", at(2)?)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Store(EventStoreError::Io(_))));
    assert_eq!(service.len(), 1);
    std::fs::remove_file(&log)?;
    std::fs::rename(&saved, &log)?;

    service.post(AccountId::new("alice")?, "after", at(3)?)?;

    let reopened = LedgerService::open(config.open_store()?, ledger_id)?;
    let texts: Vec<&str> = reopened.recent(10).iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["before", "after"]);

    Ok(())
}
