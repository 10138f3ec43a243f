//! Adapter for synchronous ChargePoint clients
//!
//! Every call is moved onto tokio's blocking pool so a slow or hung request
//! never stalls the runtime that drives coordinators and the host surface.

use super::{
    Account, ApiError, ApiResult, ChargePointApi, ChargerId, ChargingSession, HomeChargerStatus,
    HomeChargerTechnicalInfo, SessionId, UserChargingStatus,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Synchronous variant of [`ChargePointApi`]
pub trait BlockingChargePointApi: Send + Sync + 'static {
    fn login(&self, username: &str, password: &str) -> ApiResult<String>;
    fn session_token(&self) -> Option<String>;
    fn get_account(&self) -> ApiResult<Account>;
    fn get_user_charging_status(&self) -> ApiResult<Option<UserChargingStatus>>;
    fn get_charging_session(&self, session_id: SessionId) -> ApiResult<ChargingSession>;
    fn get_home_chargers(&self) -> ApiResult<Vec<ChargerId>>;
    fn get_home_charger_status(&self, charger_id: ChargerId) -> ApiResult<HomeChargerStatus>;
    fn get_home_charger_technical_info(
        &self,
        charger_id: ChargerId,
    ) -> ApiResult<HomeChargerTechnicalInfo>;
    fn set_amperage_limit(&self, charger_id: ChargerId, amperage_limit: u32) -> ApiResult<()>;
    fn start_charging_session(&self, charger_id: ChargerId) -> ApiResult<ChargingSession>;
    fn stop_charging_session(&self, session_id: SessionId) -> ApiResult<()>;
    fn restart_home_charger(&self, charger_id: ChargerId) -> ApiResult<()>;
}

/// Async facade over a [`BlockingChargePointApi`]
pub struct BlockingClient<T> {
    inner: Arc<T>,
}

impl<T: BlockingChargePointApi> BlockingClient<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    async fn run<R, F>(&self, call: F) -> ApiResult<R>
    where
        F: FnOnce(&T) -> ApiResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || call(&inner))
            .await
            .map_err(|e| ApiError::communication(format!("worker task failed: {}", e)))?
    }
}

#[async_trait]
impl<T: BlockingChargePointApi> ChargePointApi for BlockingClient<T> {
    async fn login(&self, username: &str, password: &str) -> ApiResult<String> {
        let (username, password) = (username.to_string(), password.to_string());
        self.run(move |c| c.login(&username, &password)).await
    }

    fn session_token(&self) -> Option<String> {
        self.inner.session_token()
    }

    async fn get_account(&self) -> ApiResult<Account> {
        self.run(|c| c.get_account()).await
    }

    async fn get_user_charging_status(&self) -> ApiResult<Option<UserChargingStatus>> {
        self.run(|c| c.get_user_charging_status()).await
    }

    async fn get_charging_session(&self, session_id: SessionId) -> ApiResult<ChargingSession> {
        self.run(move |c| c.get_charging_session(session_id)).await
    }

    async fn get_home_chargers(&self) -> ApiResult<Vec<ChargerId>> {
        self.run(|c| c.get_home_chargers()).await
    }

    async fn get_home_charger_status(
        &self,
        charger_id: ChargerId,
    ) -> ApiResult<HomeChargerStatus> {
        self.run(move |c| c.get_home_charger_status(charger_id))
            .await
    }

    async fn get_home_charger_technical_info(
        &self,
        charger_id: ChargerId,
    ) -> ApiResult<HomeChargerTechnicalInfo> {
        self.run(move |c| c.get_home_charger_technical_info(charger_id))
            .await
    }

    async fn set_amperage_limit(
        &self,
        charger_id: ChargerId,
        amperage_limit: u32,
    ) -> ApiResult<()> {
        self.run(move |c| c.set_amperage_limit(charger_id, amperage_limit))
            .await
    }

    async fn start_charging_session(&self, charger_id: ChargerId) -> ApiResult<ChargingSession> {
        self.run(move |c| c.start_charging_session(charger_id))
            .await
    }

    async fn stop_charging_session(&self, session_id: SessionId) -> ApiResult<()> {
        self.run(move |c| c.stop_charging_session(session_id))
            .await
    }

    async fn restart_home_charger(&self, charger_id: ChargerId) -> ApiResult<()> {
        self.run(move |c| c.restart_home_charger(charger_id))
            .await
    }
}
