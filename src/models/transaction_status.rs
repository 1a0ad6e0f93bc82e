use std::fmt::{self, Display};
use std::io::Write;

use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Int4;

/// Transaction status as it's stored in `transactions.status`.
///
/// `NotFound` and `Pending` are transient statuses reported by remote services,
/// they are never written to a transaction.
#[derive(Debug, Serialize, Deserialize, FromSqlRow, AsExpression, Clone, Copy, Eq, PartialEq, Hash)]
#[sql_type = "Int4"]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Undefined,
    New,
    NotFound,
    Successful,
    Failed,
    Pending,
    Confirmed,
    Reported,
    Sent,
}

impl TransactionStatus {
    pub fn code(&self) -> i32 {
        match self {
            TransactionStatus::Undefined => 0,
            TransactionStatus::New => 1,
            TransactionStatus::NotFound => 2,
            TransactionStatus::Successful => 3,
            TransactionStatus::Failed => 4,
            TransactionStatus::Pending => 5,
            TransactionStatus::Confirmed => 6,
            TransactionStatus::Reported => 7,
            TransactionStatus::Sent => 8,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TransactionStatus::Undefined),
            1 => Some(TransactionStatus::New),
            2 => Some(TransactionStatus::NotFound),
            3 => Some(TransactionStatus::Successful),
            4 => Some(TransactionStatus::Failed),
            5 => Some(TransactionStatus::Pending),
            6 => Some(TransactionStatus::Confirmed),
            7 => Some(TransactionStatus::Reported),
            8 => Some(TransactionStatus::Sent),
            _ => None,
        }
    }

    /// Remote statuses that leave a stored transaction untouched
    pub fn is_transient(&self) -> bool {
        match self {
            TransactionStatus::NotFound | TransactionStatus::Pending => true,
            _ => false,
        }
    }

    /// Legal forward transitions of a stored transaction. Statuses never go back.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use self::TransactionStatus::*;
        match (*self, next) {
            (Undefined, New) => true,
            (New, Sent) | (New, Confirmed) | (New, Successful) | (New, Failed) => true,
            (Sent, Confirmed) | (Sent, Successful) | (Sent, Failed) => true,
            (Confirmed, Reported) => true,
            _ => false,
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TransactionStatus::Undefined => "undefined",
            TransactionStatus::New => "new",
            TransactionStatus::NotFound => "not_found",
            TransactionStatus::Successful => "successful",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Reported => "reported",
            TransactionStatus::Sent => "sent",
        };
        f.write_str(name)
    }
}

impl FromSql<Int4, Pg> for TransactionStatus {
    fn from_sql(data: Option<&[u8]>) -> deserialize::Result<Self> {
        let code: i32 = FromSql::<Int4, Pg>::from_sql(data)?;
        TransactionStatus::from_code(code).ok_or_else(|| format!("Unrecognized transaction status: {}", code).into())
    }
}

impl ToSql<Int4, Pg> for TransactionStatus {
    fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
        ToSql::<Int4, Pg>::to_sql(&self.code(), out)
    }
}
