use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use account_history_manager::commands::account_history::{
    AccountHistoryManager, ActionContext, EVENT_DELETE, EVENT_DELETE_SELECTION, EVENT_RESTORE,
};
use account_history_manager::commands::request::ActionRequest;
use account_history_manager::data::settings::config::ConfigData;
use account_history_manager::error::{ErrorCodeString, Result};
use account_history_manager::services::account_history_service::AccountHistoryStore;
use account_history_manager::services::account_service::AccountRestorer;
use account_history_manager::services::acl_service::{AccessChecker, Acl, ActionId};
use account_history_manager::services::event_service::{Event, EventPublisher};
use account_history_manager::services::security_service::{RequestSession, SessionStore};
use account_history_manager::types::{
    AccountHistoryItem, AccountHistoryRow, ItemSearchData, ProfileData, QueryResult, UserData,
};

fn item(id: i64, account_id: i64, name: &str, client: &str, is_modify: bool) -> AccountHistoryItem {
    AccountHistoryItem {
        id,
        account_id,
        name: name.to_string(),
        client_id: 1,
        client_name: client.to_string(),
        category_id: 1,
        category_name: "Web".to_string(),
        login: Some("root".to_string()),
        url: None,
        notes: None,
        pass: vec![1],
        pass_key: vec![2],
        user_id: 1,
        user_group_id: 1,
        user_edit_id: None,
        is_private: false,
        is_private_group: false,
        pass_date: None,
        pass_date_change: None,
        date_add: "2024-01-01T00:00:00+00:00".to_string(),
        date_edit: None,
        is_modify,
        is_deleted: false,
    }
}

#[derive(Default)]
struct FakeStore {
    items: Mutex<HashMap<i64, AccountHistoryItem>>,
    calls: Mutex<Vec<String>>,
    fail_delete: bool,
    /// Batch delete drops only the first id, like a store without transactions.
    partial_batch: bool,
}

impl FakeStore {
    fn with(items: Vec<AccountHistoryItem>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().map(|i| (i.id, i)).collect()),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn remaining(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

impl AccountHistoryStore for FakeStore {
    fn search(&self, search: &ItemSearchData) -> Result<QueryResult<AccountHistoryRow>> {
        self.calls.lock().unwrap().push(format!("search:{}", search.limit_count));
        let rows: Vec<AccountHistoryRow> = self
            .items
            .lock()
            .unwrap()
            .values()
            .map(|i| AccountHistoryRow {
                id: i.id,
                account_id: i.account_id,
                name: i.name.clone(),
                client_name: i.client_name.clone(),
                login: i.login.clone(),
                date: i.display_date().to_string(),
                is_modify: i.is_modify,
                is_deleted: i.is_deleted,
            })
            .collect();
        let total = rows.len() as u64;
        Ok(QueryResult::new(rows, total))
    }

    fn get_by_id(&self, id: i64) -> Result<AccountHistoryItem> {
        self.calls.lock().unwrap().push(format!("get:{id}"));
        self.items
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| ErrorCodeString::new("ACCOUNT_HISTORY_NOT_FOUND"))
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.calls.lock().unwrap().push(format!("delete:{id}"));
        if self.fail_delete {
            return Err(ErrorCodeString::new("DB_QUERY_FAILED"));
        }
        self.items
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ErrorCodeString::new("ACCOUNT_HISTORY_NOT_FOUND"))
    }

    fn delete_by_id_batch(&self, ids: &[i64]) -> Result<usize> {
        self.calls.lock().unwrap().push(format!("delete_batch:{ids:?}"));
        let mut items = self.items.lock().unwrap();
        if self.partial_batch {
            return Ok(ids.iter().take(1).filter(|id| items.remove(*id).is_some()).count());
        }
        Ok(ids.iter().filter(|id| items.remove(*id).is_some()).count())
    }
}

#[derive(Default)]
struct FakeAccounts {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl AccountRestorer for FakeAccounts {
    fn edit_restore(&self, history_id: i64, account_id: i64) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("edit_restore:{history_id}:{account_id}"));
        if self.fail {
            return Err(ErrorCodeString::new("DB_QUERY_FAILED"));
        }
        Ok(())
    }

    fn create_from_history(&self, item: &AccountHistoryItem) -> Result<i64> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create_from_history:{}", item.id));
        if self.fail {
            panic!("account storage exploded");
        }
        Ok(100)
    }
}

#[derive(Default)]
struct FakeEvents {
    events: Mutex<Vec<(String, Event)>>,
}

impl FakeEvents {
    fn names(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }
}

impl EventPublisher for FakeEvents {
    fn notify_event(&self, name: &str, event: Event) {
        self.events.lock().unwrap().push((name.to_string(), event));
    }
}

struct FixedAcl(bool);

impl AccessChecker for FixedAcl {
    fn check_user_access(&self, _user: &UserData, _action: ActionId) -> bool {
        self.0
    }
}

struct Harness {
    store: Arc<FakeStore>,
    accounts: Arc<FakeAccounts>,
    events: Arc<FakeEvents>,
    manager: AccountHistoryManager,
}

fn harness(store: FakeStore, accounts: FakeAccounts, allowed: bool) -> Harness {
    harness_with_acl(store, accounts, Arc::new(FixedAcl(allowed)))
}

fn harness_with_acl(
    store: FakeStore,
    accounts: FakeAccounts,
    acl: Arc<dyn AccessChecker>,
) -> Harness {
    let store = Arc::new(store);
    let accounts = Arc::new(accounts);
    let events = Arc::new(FakeEvents::default());
    let manager = AccountHistoryManager::new(
        store.clone(),
        accounts.clone(),
        acl,
        events.clone(),
        ConfigData::default(),
    );
    Harness {
        store,
        accounts,
        events,
        manager,
    }
}

fn account_admin() -> UserData {
    UserData {
        id: 2,
        login: "jdoe".to_string(),
        is_admin_app: false,
        is_admin_acc: true,
        profile: ProfileData::default(),
    }
}

/// Logged in, but with no admin flag and no account-manager profile.
fn plain_user() -> UserData {
    UserData {
        id: 3,
        login: "guest".to_string(),
        is_admin_app: false,
        is_admin_acc: false,
        profile: ProfileData { mgm_accounts: false },
    }
}

fn session_for(user: UserData) -> RequestSession {
    let sessions = SessionStore::new();
    let opened = sessions.open(user).unwrap();
    sessions.begin_request(&opened.session_id).unwrap().unwrap()
}

fn session() -> RequestSession {
    session_for(account_admin())
}

/// Context whose `sk` matches the session's previous key.
fn valid_ctx(request: ActionRequest) -> ActionContext {
    ctx_for(account_admin(), request)
}

fn ctx_for(user: UserData, request: ActionRequest) -> ActionContext {
    let session = session_for(user);
    let request = request.with("sk", session.previous_key.to_string());
    ActionContext {
        session: Some(session),
        request,
    }
}

#[test]
fn unauthorized_search_never_queries_store() {
    let h = harness(FakeStore::with(vec![item(1, 1, "AWS Root", "Acme", true)]), FakeAccounts::default(), false);

    let response = h.manager.search(&valid_ctx(ActionRequest::default()));

    assert!(!response.is_success());
    assert_eq!(
        response.description,
        "You don't have permission to do this operation"
    );
    assert!(h.store.calls().is_empty());
}

#[test]
fn search_renders_grid_with_configured_page_size() {
    let h = harness(FakeStore::with(vec![item(1, 1, "AWS Root", "Acme", true)]), FakeAccounts::default(), true);

    let ctx = valid_ctx(ActionRequest::default().with("activetab", 3));
    let response = h.manager.search(&ctx);

    assert!(response.is_success());
    let html = response.data.as_ref().unwrap()["html"].as_str().unwrap();
    assert!(html.contains(r#"id="data-table-3""#));
    assert!(html.contains("AWS Root"));
    assert_eq!(h.store.calls(), vec!["search:12"]);
    assert_eq!(response.csrf, ctx.session.as_ref().unwrap().security_key);
}

#[test]
fn delete_without_valid_token_removes_nothing() {
    let h = harness(FakeStore::with(vec![item(42, 1, "AWS Root", "Acme", true)]), FakeAccounts::default(), true);

    let mut ctx = valid_ctx(ActionRequest::default());
    ctx.request = ActionRequest::default().with("sk", "forged");
    let forged = h.manager.delete(&ctx, Some(42));

    let missing = h.manager.delete(
        &ActionContext {
            session: Some(session()),
            request: ActionRequest::default().with("items", vec![42]),
        },
        None,
    );

    assert!(!forged.is_success());
    assert!(!missing.is_success());
    assert_eq!(forged.description, "Invalid action");
    assert!(h.store.calls().is_empty());
    assert_eq!(h.store.remaining(), 1);
    assert!(h.events.names().is_empty());
}

#[test]
fn missing_session_is_rejected() {
    let h = harness(FakeStore::default(), FakeAccounts::default(), true);

    let response = h.manager.restore(
        &ActionContext {
            session: None,
            request: ActionRequest::default().with("sk", "anything"),
        },
        Some(1),
    );

    assert!(!response.is_success());
    assert!(response.csrf.is_empty());
    assert!(h.store.calls().is_empty());
}

#[test]
fn single_delete_emits_event_with_name_and_client() {
    let h = harness(FakeStore::with(vec![item(42, 7, "AWS Root", "Acme", true)]), FakeAccounts::default(), true);

    let response = h.manager.delete(&valid_ctx(ActionRequest::default()), Some(42));

    assert!(response.is_success());
    assert_eq!(response.description, "Account removed");
    assert_eq!(h.store.calls(), vec!["get:42", "delete:42"]);

    let events = h.events.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let (name, event) = &events[0];
    assert_eq!(name, EVENT_DELETE);
    assert_eq!(event.message.descriptions(), ["Account removed".to_string()]);
    assert_eq!(
        event.message.details(),
        [
            ("Account".to_string(), "AWS Root".to_string()),
            ("Client".to_string(), "Acme".to_string())
        ]
    );
    assert_eq!(event.actor.as_ref().unwrap().login, "jdoe");
}

#[test]
fn batch_delete_removes_exactly_the_requested_ids() {
    let h = harness(
        FakeStore::with(vec![
            item(1, 1, "a", "Acme", true),
            item(2, 1, "b", "Acme", true),
            item(3, 1, "c", "Acme", true),
            item(4, 1, "d", "Acme", true),
        ]),
        FakeAccounts::default(),
        true,
    );

    let ctx = valid_ctx(ActionRequest::default().with("items", serde_json::json!([1, "3", 4, 4])));
    let response = h.manager.delete(&ctx, None);

    assert!(response.is_success());
    assert_eq!(response.description, "Accounts removed");
    assert_eq!(h.store.calls(), vec!["delete_batch:[1, 3, 4]"]);
    assert_eq!(h.store.remaining(), 1);
    assert_eq!(h.events.names(), vec![EVENT_DELETE_SELECTION]);
}

#[test]
fn empty_batch_is_a_validation_error() {
    let h = harness(FakeStore::default(), FakeAccounts::default(), true);

    let response = h.manager.delete(&valid_ctx(ActionRequest::default()), None);

    assert!(!response.is_success());
    assert_eq!(response.description, "No items selected");
    assert!(h.store.calls().is_empty());
}

#[test]
fn delete_failure_becomes_generic_error_envelope() {
    let store = FakeStore {
        fail_delete: true,
        ..FakeStore::with(vec![item(5, 1, "AWS Root", "Acme", true)])
    };
    let h = harness(store, FakeAccounts::default(), true);

    let response = h.manager.delete(&valid_ctx(ActionRequest::default()), Some(5));

    assert!(!response.is_success());
    assert_eq!(response.description, "Internal error");
    assert!(h.events.names().is_empty());
}

#[test]
fn restore_modify_snapshot_uses_edit_restore() {
    let h = harness(FakeStore::with(vec![item(9, 4, "AWS Root", "Acme", true)]), FakeAccounts::default(), true);

    let response = h.manager.restore(&valid_ctx(ActionRequest::default()), Some(9));

    assert!(response.is_success());
    assert_eq!(response.description, "Account restored");
    assert_eq!(*h.accounts.calls.lock().unwrap(), vec!["edit_restore:9:4"]);
    assert_eq!(h.events.names(), vec![EVENT_RESTORE]);
}

#[test]
fn restore_create_snapshot_recreates_account() {
    let h = harness(FakeStore::with(vec![item(9, 4, "AWS Root", "Acme", false)]), FakeAccounts::default(), true);

    let response = h.manager.restore(&valid_ctx(ActionRequest::default()), Some(9));

    assert!(response.is_success());
    assert_eq!(*h.accounts.calls.lock().unwrap(), vec!["create_from_history:9"]);
    assert_eq!(h.events.names(), vec![EVENT_RESTORE]);
}

#[test]
fn restore_failures_are_contained() {
    let accounts = FakeAccounts {
        fail: true,
        ..FakeAccounts::default()
    };
    let h = harness(
        FakeStore::with(vec![item(1, 4, "a", "Acme", true), item(2, 4, "b", "Acme", false)]),
        accounts,
        true,
    );

    let failed = h.manager.restore(&valid_ctx(ActionRequest::default()), Some(1));
    let panicked = h.manager.restore(&valid_ctx(ActionRequest::default()), Some(2));
    let missing_id = h.manager.restore(&valid_ctx(ActionRequest::default()), None);
    let unknown = h.manager.restore(&valid_ctx(ActionRequest::default()), Some(77));

    for response in [&failed, &panicked, &missing_id, &unknown] {
        assert!(!response.is_success());
    }
    assert_eq!(failed.description, "Internal error");
    assert_eq!(panicked.description, "Internal error");
    assert_eq!(missing_id.description, "Item id is required");
    assert_eq!(unknown.description, "Account not found");
    assert!(h.events.names().is_empty());
}

#[test]
fn short_batch_delete_is_reported_as_failure() {
    let store = FakeStore {
        partial_batch: true,
        ..FakeStore::with(vec![
            item(1, 1, "a", "Acme", true),
            item(2, 1, "b", "Acme", true),
            item(3, 1, "c", "Acme", true),
        ])
    };
    let h = harness(store, FakeAccounts::default(), true);

    let ctx = valid_ctx(ActionRequest::default().with("items", vec![1, 2, 3]));
    let response = h.manager.delete(&ctx, None);

    assert!(!response.is_success());
    assert_eq!(response.description, "Error while deleting the accounts");
    assert_eq!(h.store.calls(), vec!["delete_batch:[1, 2, 3]"]);
    assert!(h.events.names().is_empty());
    assert_eq!(response.csrf, ctx.session.as_ref().unwrap().security_key);
}

#[test]
fn plain_user_can_delete_and_restore_but_not_search() {
    let h = harness_with_acl(
        FakeStore::with(vec![
            item(1, 4, "a", "Acme", true),
            item(2, 4, "b", "Acme", true),
            item(3, 4, "c", "Acme", false),
        ]),
        FakeAccounts::default(),
        Arc::new(Acl),
    );

    let single = h.manager.delete(&ctx_for(plain_user(), ActionRequest::default()), Some(1));
    let batch = h.manager.delete(
        &ctx_for(plain_user(), ActionRequest::default().with("items", vec![2])),
        None,
    );
    let restored = h.manager.restore(&ctx_for(plain_user(), ActionRequest::default()), Some(3));
    let searched = h.manager.search(&ctx_for(plain_user(), ActionRequest::default()));

    assert_eq!(single.description, "Account removed");
    assert_eq!(batch.description, "Accounts removed");
    assert_eq!(restored.description, "Account restored");
    assert!(!searched.is_success());
    assert_eq!(
        searched.description,
        "You don't have permission to do this operation"
    );
    assert_eq!(
        h.events.names(),
        vec![EVENT_DELETE, EVENT_DELETE_SELECTION, EVENT_RESTORE]
    );
    assert!(!h.store.calls().iter().any(|c| c.starts_with("search")));
}
