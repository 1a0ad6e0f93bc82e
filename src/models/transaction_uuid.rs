use std::fmt::{self, Display};

use diesel::sql_types::Uuid as SqlUuid;
use uuid::Uuid;

/// Correlation key of an exchanger request
#[derive(Debug, Serialize, Deserialize, FromSqlRow, AsExpression, Clone, Copy, PartialEq, Eq, Hash)]
#[sql_type = "SqlUuid"]
pub struct TransactionUuid(Uuid);
derive_newtype_sql!(transaction_uuid, SqlUuid, TransactionUuid, TransactionUuid);

impl TransactionUuid {
    pub fn new(id: Uuid) -> Self {
        TransactionUuid(id)
    }

    pub fn inner(&self) -> &Uuid {
        &self.0
    }

    pub fn generate() -> Self {
        TransactionUuid(Uuid::new_v4())
    }
}

impl Display for TransactionUuid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
