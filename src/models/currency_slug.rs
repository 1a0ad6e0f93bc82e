use std::fmt::{self, Display};

use diesel::sql_types::VarChar;
use serde::{Deserialize, Deserializer};

/// Lower-cased currency identifier, e.g. `bitcoin` or `ethereum`.
#[derive(Debug, Serialize, FromSqlRow, AsExpression, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[sql_type = "VarChar"]
pub struct CurrencySlug(String);
derive_newtype_sql!(currency_slug, VarChar, CurrencySlug, CurrencySlug);

impl CurrencySlug {
    pub fn new<S: AsRef<str>>(slug: S) -> Self {
        CurrencySlug(slug.as_ref().trim().to_lowercase())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CurrencySlug {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(CurrencySlug::new)
    }
}

impl Display for CurrencySlug {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
