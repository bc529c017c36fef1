use crate::domain::ports::{Authenticator, ClockArc, TokenStoreArc};
use crate::domain::provider::{Provider, ProviderConfig};
use crate::domain::token::ProviderToken;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Lifetime assumed when the provider does not state one.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 300;
/// Subtracted from every lifetime so a token is never used right at expiry.
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 30;

/// Hands out bearer tokens per provider, authenticating only when no cached
/// token is valid.
///
/// Authentication is single-flight per provider: concurrent cold callers
/// queue on a per-provider gate and the ones after the first find the token
/// it stored.
pub struct TokenManager {
    store: TokenStoreArc,
    clock: ClockArc,
    default_lifetime: Duration,
    safety_margin: Duration,
    gates: Mutex<HashMap<Provider, Arc<Mutex<()>>>>,
}

impl TokenManager {
    pub fn new(store: TokenStoreArc, clock: ClockArc) -> Self {
        Self {
            store,
            clock,
            default_lifetime: Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
            safety_margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_lifetime(mut self, default_lifetime: Duration, safety_margin: Duration) -> Self {
        self.default_lifetime = default_lifetime;
        self.safety_margin = safety_margin;
        self
    }

    /// Returns a valid token for `config.provider`, or `None` if the provider
    /// refused to issue one. Storage faults are returned as errors.
    pub async fn get_token(
        &self,
        config: &ProviderConfig,
        authenticator: &dyn Authenticator,
    ) -> Result<Option<String>> {
        let provider = config.provider;
        if let Some(token) = self.store.current(provider, self.clock.now()).await? {
            debug!(%provider, "Using cached token");
            return Ok(Some(token.access_token));
        }

        let gate = self.gate(provider).await;
        let _in_flight = gate.lock().await;

        // Another caller may have authenticated while we waited.
        if let Some(token) = self.store.current(provider, self.clock.now()).await? {
            debug!(%provider, "Using token obtained by a concurrent caller");
            return Ok(Some(token.access_token));
        }

        let issued = match authenticator.authenticate(config).await {
            Ok(issued) => issued,
            Err(e) => {
                error!(%provider, error = %e, "Error obtaining token");
                return Ok(None);
            }
        };

        let now = self.clock.now();
        let token = ProviderToken {
            provider,
            access_token: issued.access_token,
            expires_at: self.expiry(provider, now, issued.expires_in),
            created_at: now,
        };
        self.store.save(token.clone()).await?;
        info!(%provider, expires_at = %token.expires_at, "Saved new token");

        Ok(Some(token.access_token))
    }

    /// Usable-until instant of a token issued at `now`. A stated lifetime that
    /// does not outlast the safety margin, or that cannot be represented, is
    /// replaced by the default one.
    fn expiry(&self, provider: Provider, now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
        let usable = |lifetime: Duration| {
            lifetime
                .checked_sub(&self.safety_margin)
                .filter(|usable| *usable > Duration::zero())
                .and_then(|usable| now.checked_add_signed(usable))
        };

        if let Some(secs) = expires_in {
            if let Some(expires_at) = Duration::try_seconds(secs).and_then(usable) {
                return expires_at;
            }
            warn!(%provider, expires_in = secs, "Ignoring unusable token lifetime, applying default");
        }
        usable(self.default_lifetime).unwrap_or(now)
    }

    async fn gate(&self, provider: Provider) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        gates.entry(provider).or_default().clone()
    }
}
