#![allow(dead_code)]

use async_trait::async_trait;
use chargesync::client::{
    Account, AccountBalance, ApiError, ApiResult, ChargePointApi, ChargerId, ChargingSession,
    ClientConnector, HomeChargerStatus, HomeChargerTechnicalInfo, SessionId, User,
    UserChargingStatus,
};
use chargesync::config::{Config, ConfigEntry};
use chargesync::coordinator::UpdateCoordinator;
use chargesync::persistence::{ConfigFileStore, EntryStore};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const CHARGER: ChargerId = ChargerId(42);

/// Scripted stand-in for the remote service
pub struct MockApi {
    pub state: Mutex<MockState>,
    calls: Mutex<Vec<&'static str>>,
    failures: Mutex<HashMap<&'static str, VecDeque<ApiError>>>,
}

pub struct MockState {
    pub account: Account,
    pub charging_status: Option<UserChargingStatus>,
    pub session: Option<ChargingSession>,
    pub chargers: BTreeMap<ChargerId, (HomeChargerStatus, HomeChargerTechnicalInfo)>,
    pub token: Option<String>,
    pub logins: u32,
}

impl MockApi {
    pub fn new() -> Self {
        let mut chargers = BTreeMap::new();
        chargers.insert(CHARGER, (charger_status(CHARGER, true, 16), technical_info()));
        Self {
            state: Mutex::new(MockState {
                account: account(),
                charging_status: None,
                session: None,
                chargers,
                token: Some("token-0".to_string()),
                logins: 0,
            }),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Queue an error for the next call of `method`
    pub fn fail_next(&self, method: &'static str, err: ApiError) {
        self.failures
            .lock()
            .unwrap()
            .entry(method)
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| **c == method).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn set_plugged_in(&self, charger_id: ChargerId, plugged_in: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some((status, _)) = state.chargers.get_mut(&charger_id) {
            status.plugged_in = plugged_in;
        }
    }

    pub fn set_amperage(&self, charger_id: ChargerId, amps: u32) {
        let mut state = self.state.lock().unwrap();
        if let Some((status, _)) = state.chargers.get_mut(&charger_id) {
            status.amperage_limit = amps;
        }
    }

    /// Put an active session on `charger_id`
    pub fn start_session_on(&self, charger_id: ChargerId, state_name: &str) {
        let mut state = self.state.lock().unwrap();
        state.charging_status = Some(UserChargingStatus {
            session_id: SessionId(900),
            start_time: None,
            state: state_name.to_string(),
        });
        state.session = Some(session(SessionId(900), charger_id, state_name));
    }

    pub fn end_session(&self) {
        let mut state = self.state.lock().unwrap();
        state.charging_status = None;
        state.session = None;
    }

    /// Record the call, yield once like a real request, then apply any
    /// queued failure
    async fn enter(&self, method: &'static str) -> ApiResult<()> {
        let failure = {
            self.calls.lock().unwrap().push(method);
            self.failures
                .lock()
                .unwrap()
                .get_mut(method)
                .and_then(VecDeque::pop_front)
        };
        tokio::task::yield_now().await;
        failure.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl ChargePointApi for MockApi {
    async fn login(&self, _username: &str, _password: &str) -> ApiResult<String> {
        self.enter("login").await?;
        let mut state = self.state.lock().unwrap();
        state.logins += 1;
        let token = format!("token-{}", state.logins);
        state.token = Some(token.clone());
        Ok(token)
    }

    fn session_token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }

    async fn get_account(&self) -> ApiResult<Account> {
        self.enter("get_account").await?;
        Ok(self.state.lock().unwrap().account.clone())
    }

    async fn get_user_charging_status(&self) -> ApiResult<Option<UserChargingStatus>> {
        self.enter("get_user_charging_status").await?;
        Ok(self.state.lock().unwrap().charging_status.clone())
    }

    async fn get_charging_session(&self, session_id: SessionId) -> ApiResult<ChargingSession> {
        self.enter("get_charging_session").await?;
        self.state
            .lock()
            .unwrap()
            .session
            .clone()
            .filter(|s| s.session_id == session_id)
            .ok_or_else(|| ApiError::provider("unknown session"))
    }

    async fn get_home_chargers(&self) -> ApiResult<Vec<ChargerId>> {
        self.enter("get_home_chargers").await?;
        Ok(self.state.lock().unwrap().chargers.keys().copied().collect())
    }

    async fn get_home_charger_status(&self, charger_id: ChargerId) -> ApiResult<HomeChargerStatus> {
        self.enter("get_home_charger_status").await?;
        self.state
            .lock()
            .unwrap()
            .chargers
            .get(&charger_id)
            .map(|(status, _)| status.clone())
            .ok_or_else(|| ApiError::provider("unknown charger"))
    }

    async fn get_home_charger_technical_info(
        &self,
        charger_id: ChargerId,
    ) -> ApiResult<HomeChargerTechnicalInfo> {
        self.enter("get_home_charger_technical_info").await?;
        self.state
            .lock()
            .unwrap()
            .chargers
            .get(&charger_id)
            .map(|(_, info)| info.clone())
            .ok_or_else(|| ApiError::provider("unknown charger"))
    }

    async fn set_amperage_limit(
        &self,
        charger_id: ChargerId,
        amperage_limit: u32,
    ) -> ApiResult<()> {
        self.enter("set_amperage_limit").await?;
        self.set_amperage(charger_id, amperage_limit);
        Ok(())
    }

    async fn start_charging_session(&self, charger_id: ChargerId) -> ApiResult<ChargingSession> {
        self.enter("start_charging_session").await?;
        Ok(session(SessionId(901), charger_id, "IN_USE"))
    }

    async fn stop_charging_session(&self, _session_id: SessionId) -> ApiResult<()> {
        self.enter("stop_charging_session").await?;
        Ok(())
    }

    async fn restart_home_charger(&self, _charger_id: ChargerId) -> ApiResult<()> {
        self.enter("restart_home_charger").await?;
        Ok(())
    }
}

/// Hands out one shared [`MockApi`]
pub struct MockConnector {
    pub api: Arc<MockApi>,
    pub connect_error: Mutex<Option<ApiError>>,
    pub connects: Mutex<Vec<Option<String>>>,
}

impl MockConnector {
    pub fn new(api: Arc<MockApi>) -> Self {
        Self {
            api,
            connect_error: Mutex::new(None),
            connects: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_with(&self, err: ApiError) {
        *self.connect_error.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl ClientConnector for MockConnector {
    async fn connect(
        &self,
        username: &str,
        password: &str,
        session_token: Option<&str>,
    ) -> ApiResult<Arc<dyn ChargePointApi>> {
        self.connects
            .lock()
            .unwrap()
            .push(session_token.map(str::to_string));
        if let Some(err) = self.connect_error.lock().unwrap().take() {
            return Err(err);
        }
        match session_token {
            Some(token) => self.api.state.lock().unwrap().token = Some(token.to_string()),
            None => {
                self.api.login(username, password).await?;
            }
        }
        Ok(self.api.clone())
    }
}

pub fn account() -> Account {
    Account {
        user: User {
            user_id: 1001,
            username: "driver".to_string(),
            full_name: "Test Driver".to_string(),
            email: "driver@example.com".to_string(),
        },
        account_balance: AccountBalance {
            amount: 25.0,
            currency: "USD".to_string(),
        },
    }
}

pub fn charger_status(
    charger_id: ChargerId,
    plugged_in: bool,
    amperage_limit: u32,
) -> HomeChargerStatus {
    HomeChargerStatus {
        charger_id,
        brand: "CP".to_string(),
        plugged_in,
        connected: true,
        charging_status: "AVAILABLE".to_string(),
        last_connected_at: None,
        model: "CPH50-NEMA6-50-L23".to_string(),
        amperage_limit,
        possible_amperage_limits: vec![16, 24, 32],
    }
}

pub fn technical_info() -> HomeChargerTechnicalInfo {
    HomeChargerTechnicalInfo {
        model_number: "CPH50-NEMA6-50-L23".to_string(),
        serial_number: "123456789".to_string(),
        mac_address: "00:24:B1:00:00:01".to_string(),
        software_version: "5.5.2.3".to_string(),
        last_ota_update: None,
    }
}

pub fn session(session_id: SessionId, device_id: ChargerId, state: &str) -> ChargingSession {
    ChargingSession {
        session_id,
        device_id,
        device_name: "Garage".to_string(),
        charging_state: state.to_string(),
        charging_time: 600_000,
        power_kw: 7.2,
        energy_kwh: 1.2,
        miles_added: 4.0,
        miles_added_per_hour: 24.0,
        total_amount: 0.36,
    }
}

/// Config store with one entry for `driver`
pub fn store_with_entry(poll_interval: u64) -> (Arc<ConfigFileStore>, ConfigEntry) {
    let mut entry = ConfigEntry::new("driver", "secret", "token-0");
    entry.options.poll_interval = poll_interval;
    let store = Arc::new(ConfigFileStore::in_memory(Config::default()));
    store.add_entry(entry.clone()).unwrap();
    (store, entry)
}

pub fn coordinator(
    api: &Arc<MockApi>,
) -> (Arc<UpdateCoordinator>, Arc<ConfigFileStore>, ConfigEntry) {
    let (store, entry) = store_with_entry(180);
    let store_dyn: Arc<dyn EntryStore> = store.clone();
    let coordinator = Arc::new(UpdateCoordinator::new(&entry, api.clone(), store_dyn));
    (coordinator, store, entry)
}
