table! {
    locks (key) {
        key -> Varchar,
        token -> Varchar,
        expires_at -> Timestamp,
    }
}

table! {
    transactions (id) {
        id -> Int4,
        wallet_id -> Nullable<Int4>,
        hash -> Nullable<Varchar>,
        uuid -> Nullable<Uuid>,
        address_from -> Varchar,
        address_to -> Varchar,
        currency_slug -> Varchar,
        value -> Numeric,
        status -> Int4,
        is_fee_trx -> Bool,
        confirmed_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    wallets (id) {
        id -> Int4,
        external_id -> Int4,
        currency_slug -> Varchar,
        address -> Varchar,
        is_platform -> Bool,
        on_monitoring -> Bool,
        is_active -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

joinable!(transactions -> wallets (wallet_id));

allow_tables_to_appear_in_same_query!(transactions, wallets);
