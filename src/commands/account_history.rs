use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::json;

use crate::commands::grid::AccountHistoryGrid;
use crate::commands::json_response::JsonResponse;
use crate::commands::request::ActionRequest;
use crate::data::settings::config::ConfigData;
use crate::error::{ErrorCodeString, Result};
use crate::i18n::{error_message, tr, Message};
use crate::services::account_history_service::AccountHistoryStore;
use crate::services::account_service::AccountRestorer;
use crate::services::acl_service::{AccessChecker, ActionId};
use crate::services::event_service::{Event, EventActor, EventMessage, EventPublisher};
use crate::services::security_service::{check_security_token, RequestSession};

pub const EVENT_DELETE_SELECTION: &str = "delete.accountHistory.selection";
pub const EVENT_DELETE: &str = "delete.accountHistory";
pub const EVENT_RESTORE: &str = "restore.accountHistory";

/// One inbound request: the (possibly absent) session and its parameters.
pub struct ActionContext {
    pub session: Option<RequestSession>,
    pub request: ActionRequest,
}

pub struct AccountHistoryManager {
    history: Arc<dyn AccountHistoryStore>,
    accounts: Arc<dyn AccountRestorer>,
    acl: Arc<dyn AccessChecker>,
    events: Arc<dyn EventPublisher>,
    config: ConfigData,
}

fn is_client_error(code: &str) -> bool {
    matches!(
        code,
        "ACCESS_DENIED"
            | "CSRF_TOKEN_INVALID"
            | "SESSION_REQUIRED"
            | "NO_ITEMS_SELECTED"
            | "ID_REQUIRED"
    )
}

impl AccountHistoryManager {
    pub fn new(
        history: Arc<dyn AccountHistoryStore>,
        accounts: Arc<dyn AccountRestorer>,
        acl: Arc<dyn AccessChecker>,
        events: Arc<dyn EventPublisher>,
        config: ConfigData,
    ) -> Self {
        Self {
            history,
            accounts,
            acl,
            events,
            config,
        }
    }

    fn tr(&self, message: Message) -> &'static str {
        tr(self.config.locale, message)
    }

    fn require_access(&self, session: &RequestSession, action: ActionId) -> Result<()> {
        if self.acl.check_user_access(&session.user, action) {
            Ok(())
        } else {
            Err(ErrorCodeString::new("ACCESS_DENIED"))
        }
    }

    /// Runs an action behind the session and token checks. Every error and
    /// panic ends here and becomes an error envelope.
    fn guard(
        &self,
        action: &'static str,
        ctx: &ActionContext,
        body: impl FnOnce(&RequestSession) -> Result<JsonResponse>,
    ) -> JsonResponse {
        let csrf = ctx
            .session
            .as_ref()
            .map(|s| s.security_key.clone())
            .unwrap_or_default();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let session = ctx
                .session
                .as_ref()
                .ok_or_else(|| ErrorCodeString::new("SESSION_REQUIRED"))?;
            check_security_token(&session.previous_key, ctx.request.security_token())?;
            body(session)
        }));

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                if is_client_error(&err.code) {
                    log::warn!("[ACTION][{action}] rejected: {}", err.code);
                } else {
                    log::error!("[ACTION][{action}] failed: {}", err.code);
                }
                JsonResponse::error(error_message(self.config.locale, &err.code))
            }
            Err(_) => {
                log::error!("[ACTION][{action}] panicked");
                JsonResponse::error(self.tr(Message::InternalError))
            }
        };

        response.with_csrf(csrf)
    }

    fn notify(&self, session: &RequestSession, name: &str, message: EventMessage) {
        let event = Event::new(message).with_actor(EventActor::from(&session.user));
        self.events.notify_event(name, event);
    }

    pub fn search(&self, ctx: &ActionContext) -> JsonResponse {
        self.guard("accountHistoryManager/search", ctx, |session| {
            self.require_access(session, ActionId::AccountManagerHistorySearch)?;

            let index = ctx.request.analyze_int("activetab", 0);
            let search_data = ctx.request.search_data(self.config.account_count);
            let result = self.history.search(&search_data)?;

            let grid = AccountHistoryGrid::build(self.config.locale, index, &result, &search_data);
            Ok(JsonResponse::success_data(json!({ "html": grid.render()? })))
        })
    }

    /// Deletes one snapshot when `id` is given, otherwise the `items` batch.
    /// Only search is gated by a capability; delete and restore need a
    /// session and a valid token.
    pub fn delete(&self, ctx: &ActionContext, id: Option<i64>) -> JsonResponse {
        self.guard("accountHistoryManager/delete", ctx, |session| {
            let Some(id) = id else {
                let ids = ctx.request.items_id();
                if ids.is_empty() {
                    return Err(ErrorCodeString::new("NO_ITEMS_SELECTED"));
                }
                let removed = self.history.delete_by_id_batch(&ids)?;
                if removed != ids.len() {
                    log::warn!(
                        "[ACTION][accountHistoryManager/delete] batch removed {removed} of {}",
                        ids.len()
                    );
                    return Err(ErrorCodeString::new("ACCOUNT_HISTORY_BATCH_MISMATCH"));
                }

                self.notify(
                    session,
                    EVENT_DELETE_SELECTION,
                    EventMessage::new().add_description(self.tr(Message::AccountsRemoved)),
                );
                return Ok(JsonResponse::success(self.tr(Message::AccountsRemoved)));
            };

            let details = self.history.get_by_id(id)?;
            self.history.delete(id)?;

            self.notify(
                session,
                EVENT_DELETE,
                EventMessage::new()
                    .add_description(self.tr(Message::AccountRemoved))
                    .add_detail(self.tr(Message::AccountLabel), details.name)
                    .add_detail(self.tr(Message::ClientLabel), details.client_name),
            );
            Ok(JsonResponse::success(self.tr(Message::AccountRemoved)))
        })
    }

    pub fn restore(&self, ctx: &ActionContext, id: Option<i64>) -> JsonResponse {
        self.guard("accountHistoryManager/restore", ctx, |session| {
            let id = id.ok_or_else(|| ErrorCodeString::new("ID_REQUIRED"))?;
            let details = self.history.get_by_id(id)?;

            if details.is_modify {
                self.accounts.edit_restore(id, details.account_id)?;
            } else {
                self.accounts.create_from_history(&details)?;
            }

            self.notify(
                session,
                EVENT_RESTORE,
                EventMessage::new()
                    .add_description(self.tr(Message::AccountRestored))
                    .add_detail(self.tr(Message::AccountLabel), details.name)
                    .add_detail(self.tr(Message::ClientLabel), details.client_name),
            );
            Ok(JsonResponse::success(self.tr(Message::AccountRestored)))
        })
    }
}
