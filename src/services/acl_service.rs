use crate::types::UserData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionId {
    AccountManagerHistorySearch,
}

pub trait AccessChecker: Send + Sync {
    fn check_user_access(&self, user: &UserData, action: ActionId) -> bool;
}

/// Profile-based access control.
#[derive(Debug, Default, Clone)]
pub struct Acl;

impl AccessChecker for Acl {
    fn check_user_access(&self, user: &UserData, action: ActionId) -> bool {
        if user.is_admin_app {
            return true;
        }

        let allowed = match action {
            ActionId::AccountManagerHistorySearch => {
                user.is_admin_acc || user.profile.mgm_accounts
            }
        };

        if !allowed {
            log::debug!("[ACL] user {} denied {:?}", user.login, action);
        }
        allowed
    }
}
