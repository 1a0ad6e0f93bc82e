mod amount;
mod blockchain_address;
mod currency_slug;
mod external_id;
mod transaction;
mod transaction_hash;
mod transaction_id;
mod transaction_status;
mod transaction_uuid;
mod wallet;
mod wallet_id;

pub use self::amount::*;
pub use self::blockchain_address::*;
pub use self::currency_slug::*;
pub use self::external_id::*;
pub use self::transaction::*;
pub use self::transaction_hash::*;
pub use self::transaction_id::*;
pub use self::transaction_status::*;
pub use self::transaction_uuid::*;
pub use self::wallet::*;
pub use self::wallet_id::*;
