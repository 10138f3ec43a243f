//! Remote ChargePoint service facade
//!
//! The HTTP wrapper around the ChargePoint cloud API is an external
//! collaborator. This module fixes the typed surface the rest of the crate
//! consumes ([`ChargePointApi`]), the provider error classes, and how a client
//! is obtained for a config entry ([`ClientConnector`]).

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub mod blocking;
pub mod types;

pub use types::{
    Account, AccountBalance, CHARGER_SESSION_STATE_IN_USE, ChargerId, ChargingSession,
    HomeChargerStatus, HomeChargerTechnicalInfo, SessionId, User, UserChargingStatus,
};

/// Provider error id for a wrong username or password
pub const LOGIN_ERROR_INVALID_CREDENTIALS: i64 = 9;
/// Provider error id for a locked account
pub const LOGIN_ERROR_ACCOUNT_LOCKED: i64 = 241;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures raised by the remote service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The held session token is no longer accepted
    #[error("Session token is invalid")]
    InvalidSession,

    /// Login rejected; `error_id` is the provider's code when it sent one
    #[error("Login failed ({error_id:?}): {message}")]
    Login {
        error_id: Option<i64>,
        message: String,
    },

    /// Transport failure or unexpected response
    #[error("Communication error: {message}")]
    Communication { message: String },

    /// Any other provider failure
    #[error("Provider error: {message}")]
    Provider { message: String },
}

impl ApiError {
    pub fn login<S: Into<String>>(error_id: Option<i64>, message: S) -> Self {
        ApiError::Login {
            error_id,
            message: message.into(),
        }
    }

    pub fn communication<S: Into<String>>(message: S) -> Self {
        ApiError::Communication {
            message: message.into(),
        }
    }

    pub fn provider<S: Into<String>>(message: S) -> Self {
        ApiError::Provider {
            message: message.into(),
        }
    }

    pub fn is_invalid_session(&self) -> bool {
        matches!(self, ApiError::InvalidSession)
    }
}

/// Why credentials could not be turned into a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    InvalidCredentials,
    AccountLocked,
    CannotConnect(String),
    Unknown(String),
}

impl LoginFailure {
    /// Short code shown next to the credential form
    pub fn code(&self) -> &str {
        match self {
            LoginFailure::InvalidCredentials => "invalid_credentials",
            LoginFailure::AccountLocked => "account_locked",
            LoginFailure::CannotConnect(_) => "cannot_connect",
            LoginFailure::Unknown(_) => "unknown",
        }
    }
}

impl From<&ApiError> for LoginFailure {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Login {
                error_id: Some(LOGIN_ERROR_INVALID_CREDENTIALS),
                ..
            } => LoginFailure::InvalidCredentials,
            ApiError::Login {
                error_id: Some(LOGIN_ERROR_ACCOUNT_LOCKED),
                ..
            } => LoginFailure::AccountLocked,
            ApiError::Communication { message } => LoginFailure::CannotConnect(message.clone()),
            other => LoginFailure::Unknown(other.to_string()),
        }
    }
}

/// Typed calls against one authenticated ChargePoint account
#[async_trait]
pub trait ChargePointApi: Send + Sync {
    /// Log in again; the client adopts the returned token for later calls
    async fn login(&self, username: &str, password: &str) -> ApiResult<String>;

    /// Token currently held by the client
    fn session_token(&self) -> Option<String>;

    async fn get_account(&self) -> ApiResult<Account>;

    /// `None` when the user is not charging anywhere
    async fn get_user_charging_status(&self) -> ApiResult<Option<UserChargingStatus>>;

    async fn get_charging_session(&self, session_id: SessionId) -> ApiResult<ChargingSession>;

    async fn get_home_chargers(&self) -> ApiResult<Vec<ChargerId>>;

    async fn get_home_charger_status(&self, charger_id: ChargerId)
    -> ApiResult<HomeChargerStatus>;

    async fn get_home_charger_technical_info(
        &self,
        charger_id: ChargerId,
    ) -> ApiResult<HomeChargerTechnicalInfo>;

    async fn set_amperage_limit(&self, charger_id: ChargerId, amperage_limit: u32)
    -> ApiResult<()>;

    async fn start_charging_session(&self, charger_id: ChargerId) -> ApiResult<ChargingSession>;

    async fn stop_charging_session(&self, session_id: SessionId) -> ApiResult<()>;

    async fn restart_home_charger(&self, charger_id: ChargerId) -> ApiResult<()>;
}

/// Builds an authenticated client for a config entry
#[async_trait]
pub trait ClientConnector: Send + Sync {
    /// Reuse `session_token` when given and still valid, otherwise log in
    async fn connect(
        &self,
        username: &str,
        password: &str,
        session_token: Option<&str>,
    ) -> ApiResult<Arc<dyn ChargePointApi>>;
}
