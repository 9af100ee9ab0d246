use std::collections::HashMap;
use std::sync::Mutex;

use rand::RngCore;
use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::{ErrorCodeString, Result};
use crate::types::UserData;

const SECURITY_KEY_BYTES: usize = 32;

struct SessionEntry {
    user: UserData,
    security_key: Zeroizing<String>,
}

/// State of a session for the duration of one request.
#[derive(Debug, Clone)]
pub struct RequestSession {
    pub session_id: String,
    pub user: UserData,
    /// Key issued with the previous response; the request must echo it back.
    pub previous_key: Zeroizing<String>,
    /// Key issued with this response.
    pub security_key: String,
}

#[derive(Debug, Serialize)]
pub struct OpenedSession {
    pub session_id: String,
    pub csrf: String,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

pub fn generate_security_key() -> String {
    let mut bytes = [0u8; SECURITY_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Fails closed: a missing or empty token never matches.
pub fn check_security_token(previous_key: &str, provided: Option<&str>) -> Result<()> {
    match provided {
        Some(token)
            if !token.is_empty()
                && !previous_key.is_empty()
                && bool::from(token.as_bytes().ct_eq(previous_key.as_bytes())) =>
        {
            Ok(())
        }
        _ => Err(ErrorCodeString::new("CSRF_TOKEN_INVALID")),
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, user: UserData) -> Result<OpenedSession> {
        let session_id = Uuid::new_v4().to_string();
        let csrf = generate_security_key();

        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| ErrorCodeString::new("STATE_UNAVAILABLE"))?;
        log::info!("[SESSION] opened for user {}", user.login);
        sessions.insert(
            session_id.clone(),
            SessionEntry {
                user,
                security_key: Zeroizing::new(csrf.clone()),
            },
        );

        Ok(OpenedSession { session_id, csrf })
    }

    pub fn close(&self, session_id: &str) -> Result<bool> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| ErrorCodeString::new("STATE_UNAVAILABLE"))?;
        Ok(sessions.remove(session_id).is_some())
    }

    /// Rotates the session's security key and returns the request view of it.
    /// `None` when the session is unknown.
    pub fn begin_request(&self, session_id: &str) -> Result<Option<RequestSession>> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| ErrorCodeString::new("STATE_UNAVAILABLE"))?;

        let Some(entry) = sessions.get_mut(session_id) else {
            return Ok(None);
        };

        let security_key = generate_security_key();
        let previous_key = std::mem::replace(
            &mut entry.security_key,
            Zeroizing::new(security_key.clone()),
        );

        Ok(Some(RequestSession {
            session_id: session_id.to_string(),
            user: entry.user.clone(),
            previous_key,
            security_key,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProfileData;

    fn user() -> UserData {
        UserData {
            id: 1,
            login: "admin".to_string(),
            is_admin_app: true,
            is_admin_acc: false,
            profile: ProfileData::default(),
        }
    }

    #[test]
    fn begin_request_rotates_key() {
        let store = SessionStore::new();
        let opened = store.open(user()).unwrap();

        let first = store.begin_request(&opened.session_id).unwrap().unwrap();
        assert_eq!(first.previous_key.as_str(), opened.csrf);
        assert_ne!(first.security_key, opened.csrf);
        assert_eq!(first.security_key.len(), SECURITY_KEY_BYTES * 2);

        let second = store.begin_request(&opened.session_id).unwrap().unwrap();
        assert_eq!(second.previous_key.as_str(), first.security_key);
    }

    #[test]
    fn unknown_or_closed_session_yields_none() {
        let store = SessionStore::new();
        assert!(store.begin_request("missing").unwrap().is_none());

        let opened = store.open(user()).unwrap();
        assert!(store.close(&opened.session_id).unwrap());
        assert!(store.begin_request(&opened.session_id).unwrap().is_none());
    }

    #[test]
    fn token_check_fails_closed() {
        assert!(check_security_token("abc", Some("abc")).is_ok());
        assert!(check_security_token("abc", Some("abd")).is_err());
        assert!(check_security_token("abc", Some("abcd")).is_err());
        assert!(check_security_token("abcd", Some("abc")).is_err());
        assert!(check_security_token("abc", None).is_err());
        assert!(check_security_token("", Some("")).is_err());
    }
}
