use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use thoughtswap_core::CoreError;
use thoughtswap_protocol::IdentityHint;
use thoughtswap_store::types::User;
use thoughtswap_store::users;

/// Maximum number of `email -> user_id` pairs kept in the in-process cache.
/// Simple eviction: when full, drop the oldest half.
const CACHE_MAX: usize = 256;

/// Resolves a connection's handshake `IdentityHint` to a persistent `User`
/// (§4.3). The authoritative role for every subsequent command comes from
/// the returned `User`, never from the hint.
pub struct IdentityResolver {
    db: Arc<Mutex<Connection>>,
    /// Key: email. Value: user_id. Rejoin on the same Session is the hot
    /// path this cache targets — avoids a DB round trip on every reconnect.
    cache: Mutex<HashMap<String, String>>,
    cache_order: Mutex<Vec<String>>,
}

impl IdentityResolver {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self {
            db,
            cache: Mutex::new(HashMap::new()),
            cache_order: Mutex::new(Vec::new()),
        }
    }

    /// Resolution rule (§4.3):
    /// - `email` starting with `guest_` — upsert with the hinted `{name,
    ///   role}` and a synthesized `externalId`.
    /// - otherwise — fetch by email; absence is `CoreError::Auth`.
    pub fn resolve(&self, hint: &IdentityHint) -> Result<User, CoreError> {
        if hint.is_guest() {
            let conn = self.db.lock().unwrap();
            let external_id = format!("guest:{}", Uuid::new_v4());
            let user = users::upsert_user(&conn, Some(&external_id), &hint.email, &hint.name, hint.role)
                .map_err(CoreError::from)?;
            self.cache_insert(hint.email.clone(), user.id.clone());
            info!(email = %hint.email, user_id = %user.id, "guest identity resolved");
            return Ok(user);
        }

        if let Some(user_id) = self.cache_lookup(&hint.email) {
            let conn = self.db.lock().unwrap();
            if let Some(user) = users::get_user(&conn, &user_id).map_err(CoreError::from)? {
                debug!(email = %hint.email, "identity cache hit");
                return Ok(user);
            }
            self.cache_remove(&hint.email);
        }

        let conn = self.db.lock().unwrap();
        match users::get_user_by_email(&conn, &hint.email).map_err(CoreError::from)? {
            Some(user) => {
                self.cache_insert(hint.email.clone(), user.id.clone());
                Ok(user)
            }
            None => Err(CoreError::Auth(format!(
                "no registered user for email {}",
                hint.email
            ))),
        }
    }

    /// `recordConsent(userId, bool, now) -> User` (§4.2, §4.3 `UPDATE_CONSENT`).
    pub fn record_consent(&self, user_id: &str, consent_given: bool) -> Result<User, CoreError> {
        let conn = self.db.lock().unwrap();
        users::record_consent(&conn, user_id, consent_given).map_err(CoreError::from)
    }

    fn cache_lookup(&self, email: &str) -> Option<String> {
        self.cache.lock().unwrap().get(email).cloned()
    }

    fn cache_remove(&self, email: &str) {
        let mut cache = self.cache.lock().unwrap();
        let mut order = self.cache_order.lock().unwrap();
        cache.remove(email);
        order.retain(|k| k != email);
    }

    fn cache_insert(&self, email: String, user_id: String) {
        let mut cache = self.cache.lock().unwrap();
        let mut order = self.cache_order.lock().unwrap();

        if cache.contains_key(&email) {
            cache.insert(email, user_id);
            return;
        }

        if cache.len() >= CACHE_MAX {
            let evict_count = CACHE_MAX / 2;
            let to_remove: Vec<_> = order.drain(..evict_count).collect();
            for k in to_remove {
                cache.remove(&k);
            }
        }

        order.push(email.clone());
        cache.insert(email, user_id);
    }
}
