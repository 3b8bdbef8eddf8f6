use crate::domain::models::Session;
use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

pub trait SessionStore: Send + Sync {
    fn save(&self, session: &Session) -> Result<(), InfraError>;
    fn load(&self) -> Result<Option<Session>, InfraError>;
    fn clear(&self) -> Result<(), InfraError>;
}

/// Stores the serialized session in the OS credential manager. One entry
/// replaces the hosted dashboard's `accessToken`/`refreshToken`/`tokenExpiry`
/// browser keys.
#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    service_name: String,
    account_name: String,
}

impl KeyringSessionStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new("technozlife.session", "default")
    }
}

impl SessionStore for KeyringSessionStore {
    fn save(&self, session: &Session) -> Result<(), InfraError> {
        let payload = serde_json::to_string(session)
            .map_err(|error| InfraError::Credential(error.to_string()))?;
        self.entry()?
            .set_password(&payload)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }

    fn load(&self) -> Result<Option<Session>, InfraError> {
        let payload = match self.entry()?.get_password() {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(error) => return Err(InfraError::Credential(error.to_string())),
        };

        let session = serde_json::from_str::<Session>(&payload)
            .map_err(|error| InfraError::Credential(error.to_string()))?;
        Ok(Some(session))
    }

    fn clear(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl SessionStore for InMemorySessionStore {
    fn save(&self, session: &Session) -> Result<(), InfraError> {
        let mut guard = self
            .session
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<Session>, InfraError> {
        let guard = self
            .session
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn clear(&self) -> Result<(), InfraError> {
        let mut guard = self
            .session
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn sample_session() -> Session {
        Session {
            access_token: "token-abc".to_string(),
            refresh_token: None,
            expires_at: DateTime::parse_from_rfc3339("2026-08-07T12:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn in_memory_store_roundtrips_session() {
        let store = InMemorySessionStore::default();
        assert!(store.load().expect("load empty").is_none());

        let session = sample_session();
        store.save(&session).expect("save session");
        assert_eq!(store.load().expect("load saved"), Some(session));

        store.clear().expect("clear session");
        assert!(store.load().expect("load cleared").is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let store = InMemorySessionStore::default();
        store.clear().expect("clear empty store");
        store.clear().expect("clear again");
    }
}
