use serde::{Deserialize, Serialize};

/// Reasons `authorization` (and the handlers layered on top of it) can
/// refuse a call. Serialized as the `SCREAMING_SNAKE_CASE` strings the bus
/// contract pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnauthorizedReason {
    NotFound,
    NotActive,
    UnreachableDestination,
    BalanceInsufficient,
    TooManyRunningTransactions
}

/// Reasons a store-backed operation (begin/end/rollback/record) failed
/// outright rather than merely being unauthorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailedReason {
    NotFound,
    NotActive,
    InternalError
}

impl From<UnauthorizedReason> for FailedReason {
    fn from(reason: UnauthorizedReason) -> Self {
        match reason {
            UnauthorizedReason::NotFound => FailedReason::NotFound,
            UnauthorizedReason::NotActive => FailedReason::NotActive,
            _ => FailedReason::InternalError
        }
    }
}
