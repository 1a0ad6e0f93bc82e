use std::fmt::{self, Display};

use diesel::sql_types::Int4;

#[derive(Debug, Serialize, Deserialize, FromSqlRow, AsExpression, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[sql_type = "Int4"]
pub struct TransactionId(i32);
derive_newtype_sql!(transaction_id, Int4, TransactionId, TransactionId);

impl TransactionId {
    pub fn new(id: i32) -> Self {
        TransactionId(id)
    }

    pub fn inner(&self) -> i32 {
        self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
