use serde::{Deserialize, Serialize};

/// The six bus method names the dispatcher binds, exactly as they appear on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodName {
    Authorization,
    AuthorizationTransaction,
    BeginTransaction,
    EndTransaction,
    RollbackTransaction,
    RecordTransaction
}

impl MethodName {
    pub const ALL: [MethodName; 6] = [
        MethodName::Authorization,
        MethodName::AuthorizationTransaction,
        MethodName::BeginTransaction,
        MethodName::EndTransaction,
        MethodName::RollbackTransaction,
        MethodName::RecordTransaction
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MethodName::Authorization => "authorization",
            MethodName::AuthorizationTransaction => "authorization_transaction",
            MethodName::BeginTransaction => "begin_transaction",
            MethodName::EndTransaction => "end_transaction",
            MethodName::RollbackTransaction => "rollback_transaction",
            MethodName::RecordTransaction => "record_transaction"
        }
    }
}

/// AMQP publish priority. Maps onto `BasicProperties::priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low = 10,
    Medium = 20,
    High = 30
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Priority {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_name_str_matches_wire_contract() {
        assert_eq!(MethodName::Authorization.as_str(), "authorization");
        assert_eq!(
            MethodName::AuthorizationTransaction.as_str(),
            "authorization_transaction"
        );
        assert_eq!(MethodName::RecordTransaction.as_str(), "record_transaction");
    }

    #[test]
    fn priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
