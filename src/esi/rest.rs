//! REST client for the EVE ESI API implementing [`DataProvider`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};
use url::Url;

use super::records::{
    EsiAsset, EsiCharacterOrder, EsiContract, EsiMarketOrder, EsiWalletTransaction,
};
use crate::common::errors::{CoreError, Result};
use crate::common::traits::DataProvider;
use crate::common::types::{
    AssetLine, ContractSummary, PriceQuote, TradeHub, WalletTransaction,
};
use crate::config::EsiConfig;

/// Pagination header ESI attaches to list endpoints
const PAGES_HEADER: &str = "x-pages";

/// [`DataProvider`] backed by the public and character ESI endpoints.
///
/// Carries an optional static bearer token for character endpoints;
/// token acquisition and refresh live outside this crate. Network and
/// 5xx failures surface as `ProviderUnavailable`, 401/403 as
/// `ProviderAuth`, never as empty results.
#[derive(Debug, Clone)]
pub struct EsiProvider {
    client: Client,
    base_url: String,
    character_id: Option<u64>,
    access_token: Option<String>,
}

impl EsiProvider {
    /// Create a provider from config; validates the base URL
    pub fn new(config: &EsiConfig) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            CoreError::ConfigurationInvalid(format!("esi.base_url is not a valid URL: {e}"))
        })?;
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            character_id: config.character_id,
            access_token: config.access_token.clone(),
        })
    }

    /// Character id, or an auth error for endpoints that need one
    fn character_id(&self) -> Result<u64> {
        self.character_id.ok_or_else(|| {
            CoreError::ProviderAuth("character_id not configured for character endpoints".into())
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Issue one GET and decode the JSON body, mapping HTTP failures
    /// onto the provider error taxonomy
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .authed(self.client.get(url))
            .send()
            .await
            .map_err(|e| CoreError::ProviderUnavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                response.json::<T>().await.map_err(|e| {
                    CoreError::MalformedRecord(format!("undecodable body from {url}: {e}"))
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CoreError::ProviderAuth(
                format!("{url} returned {}", response.status()),
            )),
            status => Err(CoreError::ProviderUnavailable(format!(
                "{url} returned {status}"
            ))),
        }
    }

    /// Fetch every page of a paginated list endpoint, following the
    /// `x-pages` header
    async fn get_paged<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut results: Vec<T> = Vec::new();
        let mut page = 1u32;
        loop {
            let page_url = format!("{url}{}page={page}", if url.contains('?') { "&" } else { "?" });
            let response = self
                .authed(self.client.get(&page_url))
                .send()
                .await
                .map_err(|e| CoreError::ProviderUnavailable(e.to_string()))?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(CoreError::ProviderAuth(format!(
                    "{page_url} returned {status}"
                )));
            }
            if !status.is_success() {
                return Err(CoreError::ProviderUnavailable(format!(
                    "{page_url} returned {status}"
                )));
            }

            let total_pages: u32 = response
                .headers()
                .get(PAGES_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);

            let mut batch: Vec<T> = response.json().await.map_err(|e| {
                CoreError::MalformedRecord(format!("undecodable body from {page_url}: {e}"))
            })?;
            results.append(&mut batch);

            if page >= total_pages {
                return Ok(results);
            }
            page += 1;
        }
    }

    async fn fetch_region_orders(&self, region_id: u64) -> Result<Vec<EsiMarketOrder>> {
        let url = format!("{}/markets/{region_id}/orders/?order_type=all", self.base_url);
        self.get_paged(&url).await
    }
}

#[async_trait]
impl DataProvider for EsiProvider {
    /// Fetch market quotes for each hub region, keeping quotes at the
    /// hub station and dropping malformed records with a warning
    #[instrument(skip(self, hubs), fields(hub_count = hubs.len()))]
    async fn fetch_market_quotes(&self, hubs: &[TradeHub]) -> Result<Vec<PriceQuote>> {
        let mut quotes = Vec::new();
        for hub in hubs {
            let orders = self.fetch_region_orders(hub.region_id).await?;
            debug!(hub = %hub, orders = orders.len(), "fetched region orders");
            for order in orders {
                if order.location_id != hub.station_id {
                    continue;
                }
                match order.into_market_quote() {
                    Ok(quote) => quotes.push(quote),
                    Err(e) => warn!(hub = %hub, "dropping market order: {e}"),
                }
            }
        }
        Ok(quotes)
    }

    #[instrument(skip(self))]
    async fn fetch_wallet_transactions(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>> {
        let character_id = self.character_id()?;
        let url = format!(
            "{}/characters/{character_id}/wallet/transactions/",
            self.base_url
        );
        let records: Vec<EsiWalletTransaction> = self.get_json(&url).await?;
        let mut transactions = Vec::new();
        for record in records {
            if record.date < since {
                continue;
            }
            match record.into_transaction() {
                Ok(tx) => transactions.push(tx),
                Err(e) => warn!("dropping wallet transaction: {e}"),
            }
        }
        Ok(transactions)
    }

    #[instrument(skip(self))]
    async fn fetch_open_orders(&self) -> Result<Vec<PriceQuote>> {
        let character_id = self.character_id()?;
        let url = format!("{}/characters/{character_id}/orders/", self.base_url);
        let records: Vec<EsiCharacterOrder> = self.get_json(&url).await?;
        let mut orders = Vec::new();
        for record in records {
            match record.into_order_quote() {
                Ok(order) => orders.push(order),
                Err(e) => warn!("dropping character order: {e}"),
            }
        }
        Ok(orders)
    }

    /// Fetch assets held at the hub stations (paged endpoint)
    #[instrument(skip(self, hubs), fields(hub_count = hubs.len()))]
    async fn fetch_assets(&self, hubs: &[TradeHub]) -> Result<Vec<AssetLine>> {
        let character_id = self.character_id()?;
        let url = format!("{}/characters/{character_id}/assets/", self.base_url);
        let records: Vec<EsiAsset> = self.get_paged(&url).await?;

        let mut assets = Vec::new();
        for record in records {
            if !hubs.iter().any(|hub| hub.station_id == record.location_id) {
                continue;
            }
            match record.into_asset_line() {
                Ok(asset) => assets.push(asset),
                Err(e) => warn!("dropping asset record: {e}"),
            }
        }
        Ok(assets)
    }

    #[instrument(skip(self))]
    async fn fetch_wallet_balance(&self) -> Result<Decimal> {
        let character_id = self.character_id()?;
        let url = format!("{}/characters/{character_id}/wallet/", self.base_url);
        self.get_json(&url).await
    }

    #[instrument(skip(self))]
    async fn fetch_contract_summary(&self) -> Result<ContractSummary> {
        let character_id = self.character_id()?;
        let url = format!("{}/characters/{character_id}/contracts/", self.base_url);
        let records: Vec<EsiContract> = self.get_json(&url).await?;

        let open: Vec<&EsiContract> = records.iter().filter(|c| c.is_open()).collect();
        let total_collateral = open
            .iter()
            .filter_map(|c| c.collateral)
            .sum();
        Ok(ContractSummary {
            open_count: open.len() as i64,
            total_collateral,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_requires_valid_base_url() {
        let mut config = EsiConfig::default();
        config.base_url = "not a url".into();
        assert!(matches!(
            EsiProvider::new(&config),
            Err(CoreError::ConfigurationInvalid(_))
        ));
    }

    #[test]
    fn base_url_is_normalized() {
        let mut config = EsiConfig::default();
        config.base_url = "https://esi.evetech.net/latest/".into();
        let provider = EsiProvider::new(&config).unwrap();
        assert_eq!(provider.base_url, "https://esi.evetech.net/latest");
    }

    #[tokio::test]
    async fn character_endpoints_need_a_character_id() {
        let provider = EsiProvider::new(&EsiConfig::default()).unwrap();
        let err = provider.fetch_wallet_balance().await.unwrap_err();
        assert!(matches!(err, CoreError::ProviderAuth(_)));
    }
}
