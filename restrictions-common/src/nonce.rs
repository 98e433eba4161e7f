use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::time::TimeSource;

const NONCE_LENGTH: usize = 10;
pub const DEFAULT_LIFETIME_SECS: u64 = 86_400;

/// Which half of the lifetime window a nonce was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceAge {
    Current,
    Previous,
}

/// Short-lived form tokens bound to an action and a user. A token stays valid
/// for between half and one full lifetime.
#[derive(Clone)]
pub struct NonceService {
    secret: String,
    lifetime_secs: u64,
    time: Arc<dyn TimeSource>,
}

impl NonceService {
    pub fn new(secret: &str, lifetime_secs: u64, time: Arc<dyn TimeSource>) -> Self {
        NonceService {
            secret: secret.to_string(),
            lifetime_secs,
            time,
        }
    }

    fn tick(&self) -> i64 {
        let half = (self.lifetime_secs / 2).max(1) as i64;
        let now = self.time.now_unix().max(0);
        (now + half - 1) / half
    }

    fn digest(&self, action: &str, user: &str, tick: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(action.as_bytes());
        hasher.update(user.as_bytes());
        hasher.update(tick.to_string().as_bytes());

        let mut nonce = hex::encode(hasher.finalize());
        nonce.truncate(NONCE_LENGTH);
        nonce
    }

    pub fn create(&self, action: &str, user: &str) -> String {
        self.digest(action, user, self.tick())
    }

    pub fn verify(&self, nonce: &str, action: &str, user: &str) -> Option<NonceAge> {
        if nonce.is_empty() {
            return None;
        }

        let tick = self.tick();
        if same_token(&self.digest(action, user, tick), nonce) {
            Some(NonceAge::Current)
        } else if same_token(&self.digest(action, user, tick - 1), nonce) {
            Some(NonceAge::Previous)
        } else {
            None
        }
    }
}

fn same_token(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
