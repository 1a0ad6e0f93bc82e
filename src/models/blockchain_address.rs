use std::fmt::{self, Display};

use diesel::sql_types::VarChar;
use serde::{Deserialize, Deserializer};

/// Chain address, lower-cased so that matching is case insensitive
#[derive(Debug, Serialize, FromSqlRow, AsExpression, Clone, Default, PartialEq, Eq, Hash)]
#[sql_type = "VarChar"]
pub struct BlockchainAddress(String);
derive_newtype_sql!(blockchain_address, VarChar, BlockchainAddress, BlockchainAddress);

impl BlockchainAddress {
    pub fn new<S: AsRef<str>>(address: S) -> Self {
        BlockchainAddress(address.as_ref().trim().to_lowercase())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for BlockchainAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(BlockchainAddress::new)
    }
}

impl Display for BlockchainAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
