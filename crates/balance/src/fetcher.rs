use crate::{FetchError, FetchOutcome, FetchRequest};
use client::{ClientCache, ClientError};
use futures::join;
use normalize::{format_units, DEFAULT_DECIMALS};
use std::{future::Future, sync::Arc};
use tracing::{debug, warn};

/// Resolves balances and token metadata through a shared [`ClientCache`].
#[derive(Clone)]
pub struct BalanceFetcher {
    cache: Arc<ClientCache>,
}

impl BalanceFetcher {
    pub const fn new(cache: Arc<ClientCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }

    /// Fetch one query's balance.
    ///
    /// The balance call and every metadata call not already cached run
    /// concurrently. Only the balance call is mandatory: a failed metadata
    /// call falls back to 18 decimals, the user's symbol hint and the
    /// previously known name.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, FetchError> {
        let client = self.cache.client_for(&request.target)?;
        let token = request.token.as_str();

        debug!(
            id = %request.id,
            family = %client.family(),
            token = %token,
            holder = %request.holder,
            "Fetching balance"
        );

        let cached = &request.cached;
        let (balance, decimals, symbol, name) = join!(
            client.balance_of(token, &request.holder),
            resolve(cached.decimals, "decimals", &request.id, || client.decimals(token)),
            resolve(known(&cached.symbol), "symbol", &request.id, || client.symbol(token)),
            resolve(known(&cached.name), "name", &request.id, || client.name(token)),
        );

        let raw_balance = balance?;
        let decimals = decimals.unwrap_or(DEFAULT_DECIMALS);
        let symbol = symbol
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| request.symbol_hint.clone());
        let name = name.unwrap_or_default();
        let balance = format_units(raw_balance, decimals)?;

        debug!(id = %request.id, %balance, %symbol, "Balance fetched");

        Ok(FetchOutcome {
            raw_balance,
            decimals,
            symbol,
            name,
            balance,
        })
    }
}

fn known(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Use the cached value, or ask the chain and swallow the error.
async fn resolve<T, F, Fut>(cached: Option<T>, field: &str, id: &str, query: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    if cached.is_some() {
        return cached;
    }
    match query().await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(id, field, error = %e, "Failed to resolve token metadata");
            None
        }
    }
}
