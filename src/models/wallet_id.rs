use std::fmt::{self, Display};

use diesel::sql_types::Int4;

#[derive(Debug, Serialize, Deserialize, FromSqlRow, AsExpression, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[sql_type = "Int4"]
pub struct WalletId(i32);
derive_newtype_sql!(wallet_id, Int4, WalletId, WalletId);

impl WalletId {
    pub fn new(id: i32) -> Self {
        WalletId(id)
    }

    pub fn inner(&self) -> i32 {
        self.0
    }
}

impl Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
