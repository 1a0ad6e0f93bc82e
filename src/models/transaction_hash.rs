use std::fmt::{self, Display};

use diesel::sql_types::VarChar;

#[derive(Debug, Serialize, Deserialize, FromSqlRow, AsExpression, Clone, PartialEq, Eq, Hash)]
#[sql_type = "VarChar"]
pub struct TransactionHash(String);
derive_newtype_sql!(transaction_hash, VarChar, TransactionHash, TransactionHash);

impl TransactionHash {
    pub fn new(hash: String) -> Self {
        TransactionHash(hash)
    }

    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
