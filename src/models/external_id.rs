use diesel::sql_types::Int4;

/// Correlation key assigned by the service that put the wallet on monitoring
#[derive(Debug, Serialize, Deserialize, FromSqlRow, AsExpression, Clone, Copy, PartialEq, Eq, Hash)]
#[sql_type = "Int4"]
pub struct ExternalId(i32);
derive_newtype_sql!(external_id, Int4, ExternalId, ExternalId);

impl ExternalId {
    pub fn new(id: i32) -> Self {
        ExternalId(id)
    }

    pub fn inner(&self) -> i32 {
        self.0
    }
}
