//! Single-flight token refresh.
//!
//! At most one refresh runs per client. Callers that ask for a refresh while
//! one is in flight await the same future and receive the same outcome. The
//! refresh itself runs on its own task, so it completes (and writes the store)
//! even when every waiter is cancelled.

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use log::debug;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::token::{TokenStore, mask};
use crate::error::{Error, Result};

/// The opaque refresh operation: obtains a new access token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_token(&self) -> anyhow::Result<String>;
}

type Outcome = std::result::Result<String, Arc<anyhow::Error>>;
type InFlight = Shared<BoxFuture<'static, Outcome>>;

pub struct RefreshCoordinator {
    refresher: Arc<dyn TokenRefresher>,
    store: Arc<TokenStore>,
    in_flight: Mutex<Option<InFlight>>,
}

impl RefreshCoordinator {
    pub fn new(refresher: Arc<dyn TokenRefresher>, store: Arc<TokenStore>) -> Self {
        Self {
            refresher,
            store,
            in_flight: Mutex::new(None),
        }
    }

    /// Refreshes the access token and returns the new value.
    ///
    /// `stale` is the token the failed attempt was sent with. If the store
    /// already holds a different token, another caller has refreshed in the
    /// meantime and that token is returned without a new refresh.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self, stale: Option<&str>) -> Result<String> {
        let flight = {
            let mut slot = self.in_flight.lock().await;

            if let Some(current) = self
                .store
                .get()
                .await
                .filter(|current| Some(current.as_str()) != stale)
            {
                debug!("Token already rotated to {}, skipping refresh", mask(&current));
                return Ok(current);
            }

            match slot.as_ref() {
                Some(flight) if flight.peek().is_none() => {
                    debug!("Joining in-flight token refresh");
                    flight.clone()
                }
                _ => {
                    let flight = self.start();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        let outcome = flight.clone().await;

        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().is_some_and(|f| f.ptr_eq(&flight)) {
            *slot = None;
        }

        outcome.map_err(Error::Refresh)
    }

    /// The store is written only after the refresher succeeds with a
    /// non-empty token, in one write.
    fn start(&self) -> InFlight {
        let refresher = Arc::clone(&self.refresher);
        let store = Arc::clone(&self.store);

        let task = tokio::spawn(async move {
            debug!("Refreshing access token...");
            let token = refresher.refresh_token().await.map_err(Arc::new)?;
            if token.is_empty() {
                return Err(Arc::new(anyhow::anyhow!(
                    "Refresher returned an empty access token"
                )));
            }
            store.set(token.clone()).await;
            debug!("Access token refreshed: {}", mask(&token));
            Ok(token)
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(Arc::new(
                    anyhow::Error::new(e).context("Token refresh task failed"),
                )),
            }
        }
        .boxed()
        .shared()
    }
}
