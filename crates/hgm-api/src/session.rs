use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Role, User};
use crate::store::{KvStore, SESSION_USER_KEY, TOKEN_KEY};

/// An authenticated session: created at login, cleared at logout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: Option<User>,
}

impl Session {
    pub fn new(token: impl Into<String>, user: Option<User>) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    pub fn role(&self) -> Option<&Role> {
        self.user.as_ref()?.role.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref()?.username.as_deref()
    }
}

pub fn save_session(store: &KvStore, session: &Session) -> Result<()> {
    store.transaction(|entries| {
        entries.insert(TOKEN_KEY.to_string(), session.token.clone());
        match &session.user {
            Some(user) => {
                entries.insert(SESSION_USER_KEY.to_string(), serde_json::to_string(user)?);
            }
            None => {
                entries.remove(SESSION_USER_KEY);
            }
        }
        Ok(())
    })
}

/// The persisted session, if a token was saved.
pub fn load_session(store: &KvStore) -> Result<Option<Session>> {
    store.transaction(|entries| {
        let Some(token) = entries.get(TOKEN_KEY).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let user = match entries.get(SESSION_USER_KEY) {
            Some(raw) => match serde_json::from_str::<User>(raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    log::warn!("Ignoring unreadable session user: {e}");
                    None
                }
            },
            None => None,
        };
        Ok(Some(Session::new(token.clone(), user)))
    })
}

pub fn clear_session(store: &KvStore) -> Result<()> {
    store.transaction(|entries| {
        entries.remove(TOKEN_KEY);
        entries.remove(SESSION_USER_KEY);
        Ok(())
    })
}
