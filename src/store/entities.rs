//! Typed rows for the replicated entity set.
//!
//! Every replicated table is declared exactly once in the `replicated_entities!`
//! invocation at the bottom of this file. From that declaration the macro
//! derives the row struct, its column list, the select and upsert statements,
//! the order in which columns are bound, and the `EntityKind` / `Record`
//! enums the rest of the crate works with. Columns stored as `numeric` or as a
//! Postgres enum travel as text and are cast on the way in and out.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::Postgres;
use std::fmt;
use std::sync::OnceLock;

/// A bound upsert statement.
pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// A mapped column and the SQL type it is cast to, if it travels as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub cast: Option<&'static str>,
}

/// A table that takes part in cross-store replication.
pub trait Entity: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin + Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [Column];

    /// Primary key; every replicated table is keyed by a serial `id`.
    fn id(&self) -> i32;

    fn select_sql() -> &'static str;
    fn upsert_sql() -> &'static str;

    /// Bind every column, in `COLUMNS` order.
    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;
}

/// `SELECT` for every mapped column, ordered by key.
pub fn select_statement(table: &str, columns: &[Column]) -> String {
    let list = columns
        .iter()
        .map(|c| match c.cast {
            Some(_) => format!("\"{0}\"::text AS \"{0}\"", c.name),
            None => format!("\"{}\"", c.name),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {list} FROM public.{table} ORDER BY \"id\"")
}

/// Insert-or-update-all-columns keyed by `id`.
pub fn upsert_statement(table: &str, columns: &[Column]) -> String {
    let names = columns
        .iter()
        .map(|c| format!("\"{}\"", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = columns
        .iter()
        .enumerate()
        .map(|(i, c)| match c.cast {
            Some(cast) => format!("${}::{}", i + 1, cast),
            None => format!("${}", i + 1),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let updates = columns
        .iter()
        .filter(|c| c.name != "id")
        .map(|c| format!("\"{0}\" = EXCLUDED.\"{0}\"", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO public.{table} ({names}) VALUES ({placeholders}) \
         ON CONFLICT (\"id\") DO UPDATE SET {updates}"
    )
}

async fn fetch_rows<E: Entity>(pool: &PgPool) -> Result<Vec<E>, sqlx::Error> {
    sqlx::query_as::<_, E>(E::select_sql()).fetch_all(pool).await
}

async fn upsert_row<E: Entity>(row: &E, pool: &PgPool) -> Result<(), sqlx::Error> {
    row.bind_columns(sqlx::query(E::upsert_sql()))
        .execute(pool)
        .await?;
    Ok(())
}

macro_rules! column_cast {
    () => {
        None
    };
    ($cast:literal) => {
        Some($cast)
    };
}

macro_rules! replicated_entities {
    ($(
        $(#[$meta:meta])*
        $kind:ident => $table:literal {
            $($field:ident : $ty:ty $(=> $cast:literal)?),+ $(,)?
        }
    )+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
            pub struct $kind {
                $(pub $field: $ty),+
            }

            impl Entity for $kind {
                const TABLE: &'static str = $table;
                const COLUMNS: &'static [Column] = &[
                    $(Column { name: stringify!($field), cast: column_cast!($($cast)?) }),+
                ];

                fn id(&self) -> i32 {
                    self.id
                }

                fn select_sql() -> &'static str {
                    static SQL: OnceLock<String> = OnceLock::new();
                    SQL.get_or_init(|| select_statement(Self::TABLE, Self::COLUMNS))
                }

                fn upsert_sql() -> &'static str {
                    static SQL: OnceLock<String> = OnceLock::new();
                    SQL.get_or_init(|| upsert_statement(Self::TABLE, Self::COLUMNS))
                }

                fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
                    query $(.bind(&self.$field))+
                }
            }

            impl From<$kind> for Record {
                fn from(row: $kind) -> Self {
                    Record::$kind(row)
                }
            }
        )+

        /// One replicated table.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum EntityKind {
            $($kind),+
        }

        impl EntityKind {
            /// Every replicated table, in sync order.
            pub const ALL: &'static [EntityKind] = &[$(EntityKind::$kind),+];

            pub fn table(self) -> &'static str {
                match self {
                    $(EntityKind::$kind => $table),+
                }
            }

            pub fn columns(self) -> &'static [Column] {
                match self {
                    $(EntityKind::$kind => <$kind as Entity>::COLUMNS),+
                }
            }

            pub fn from_table(table: &str) -> Option<Self> {
                match table {
                    $($table => Some(EntityKind::$kind),)+
                    _ => None,
                }
            }

            pub(crate) async fn fetch_from(self, pool: &PgPool) -> Result<Vec<Record>, sqlx::Error> {
                match self {
                    $(EntityKind::$kind => Ok(fetch_rows::<$kind>(pool)
                        .await?
                        .into_iter()
                        .map(Record::$kind)
                        .collect()),)+
                }
            }
        }

        /// A row of any replicated table.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Record {
            $($kind($kind)),+
        }

        impl Record {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Record::$kind(_) => EntityKind::$kind),+
                }
            }

            pub fn id(&self) -> i32 {
                match self {
                    $(Record::$kind(row) => row.id()),+
                }
            }

            pub(crate) async fn upsert_into(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
                match self {
                    $(Record::$kind(row) => upsert_row(row, pool).await),+
                }
            }
        }
    };
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

replicated_entities! {
    /// Global application settings.
    AppConfig => "app_config" {
        id: i32,
        key: String,
        value: String,
        created_at: Option<NaiveDateTime>,
        updated_at: Option<NaiveDateTime>,
    }

    /// Per-wallet user settings.
    User => "users" {
        id: i32,
        wallet_address: String,
        username: Option<String>,
        email: Option<String>,
        theme: Option<String>,
        default_network: Option<String>,
        is_admin: Option<bool>,
        wallet_display: Option<String>,
        language: Option<String>,
        gas_preference: Option<String>,
        auto_harvest: Option<bool>,
        harvest_percentage: Option<i32>,
        has_accepted_legal_terms: Option<bool>,
        legal_terms_accepted_at: Option<NaiveDateTime>,
        terms_of_use_accepted: Option<bool>,
        privacy_policy_accepted: Option<bool>,
        disclaimer_accepted: Option<bool>,
        created_at: Option<NaiveDateTime>,
        updated_at: Option<NaiveDateTime>,
    }

    /// Liquidity pools registered by administrators.
    CustomPool => "custom_pools" {
        id: i32,
        address: String,
        name: String,
        network_id: i32,
        network_name: String,
        network: Option<String>,
        token0_symbol: String,
        token1_symbol: String,
        token0_name: String,
        token1_name: String,
        token0_decimals: i32,
        token1_decimals: i32,
        token0_address: String,
        token1_address: String,
        fee_tier: i32,
        active: Option<bool>,
        created_by: String,
        created_at: Option<NaiveDateTime>,
        updated_at: Option<NaiveDateTime>,
    }

    /// Liquidity positions and their lifecycle, one row per deposit.
    PositionHistory => "position_history" {
        id: i32,
        wallet_address: String,
        token_id: Option<String>,
        pool_address: String,
        pool_name: String,
        token0: String,
        token1: String,
        token0_decimals: i32,
        token1_decimals: i32,
        token0_amount: String,
        token1_amount: String,
        liquidity_added: Option<String>,
        tx_hash: Option<String>,
        deposited_usdc: String => "numeric",
        timestamp: Option<NaiveDateTime>,
        start_date: Option<NaiveDateTime>,
        end_date: Option<NaiveDateTime>,
        closed_date: Option<NaiveDateTime>,
        timeframe: i32,
        contract_duration: Option<i32>,
        status: String,
        apr: String => "numeric",
        current_apr: Option<String> => "numeric",
        last_apr_update: Option<NaiveDateTime>,
        fees_earned: Option<String> => "numeric",
        fees_collected: Option<String> => "numeric",
        total_fees_collected: Option<String> => "numeric",
        fee_collection_status: Option<String>,
        last_collection_date: Option<NaiveDateTime>,
        lower_price: Option<String> => "numeric",
        upper_price: Option<String> => "numeric",
        in_range: Option<bool>,
        range_width: Option<String>,
        impermanent_loss_risk: Option<String>,
        data: Option<Value>,
        nft_token_id: Option<String>,
        network: Option<String>,
        nft_url: Option<String>,
        contract_address: Option<String>,
        token_pair: Option<String>,
        fee: Option<String>,
        nft_creation_pending: Option<bool>,
        nft_creation_status: Option<String>,
        nft_created_at: Option<NaiveDateTime>,
        nft_transaction_hash: Option<String>,
        nft_creation_error: Option<String>,
        nft_creation_attempts: Option<i32>,
        wbc_minted_amount: Option<String>,
        wbc_minted_at: Option<NaiveDateTime>,
        wbc_mint_tx_hash: Option<String>,
        wbc_returned_amount: Option<String>,
        wbc_returned_at: Option<NaiveDateTime>,
        wbc_return_tx_hash: Option<String>,
        auto_renewed: Option<bool>,
        auto_renewed_at: Option<NaiveDateTime>,
        auto_renew_reason: Option<String>,
    }

    /// Reward simulator adjustments per timeframe.
    TimeframeAdjustment => "timeframe_adjustments" {
        id: i32,
        timeframe: i32,
        adjustment_percentage: String => "numeric",
        description: String,
        updated_at: Option<NaiveDateTime>,
        updated_by: Option<String>,
    }

    RealPosition => "real_positions" {
        id: i32,
        wallet_address: String,
        virtual_position_id: String,
        pool_address: String,
        pool_name: String,
        token0: String,
        token1: String,
        token0_amount: String,
        token1_amount: String,
        token_id: Option<String>,
        tx_hash: Option<String>,
        network: String,
        nft_url: Option<String>,
        status: String,
        block_explorer_url: Option<String>,
        liquidity_value: Option<String>,
        fees_earned: Option<String>,
        in_range: Option<bool>,
        additional_data: Option<Value>,
        created_at: Option<NaiveDateTime>,
        updated_at: Option<NaiveDateTime>,
    }

    Invoice => "invoices" {
        id: i32,
        invoice_number: String,
        wallet_address: String,
        position_id: i32,
        amount: String => "numeric",
        status: String,
        payment_method: Option<String>,
        transaction_hash: Option<String>,
        bank_reference: Option<String>,
        issue_date: Option<NaiveDateTime>,
        due_date: Option<NaiveDateTime>,
        paid_date: Option<NaiveDateTime>,
        billing_profile_id: Option<i32>,
        payment_intent_id: Option<String>,
        client_name: Option<String>,
        client_address: Option<String>,
        client_city: Option<String>,
        client_country: Option<String>,
        client_tax_id: Option<String>,
        notes: Option<String>,
        additional_data: Option<Value>,
        items: Option<Value>,
        currency: Option<String>,
        created_at: Option<NaiveDateTime>,
        updated_at: Option<NaiveDateTime>,
    }

    /// Referral codes. Synced before `referred_users`, which references it.
    Referral => "referrals" {
        id: i32,
        referral_code: String,
        wallet_address: String,
        email: Option<String>,
        total_rewards: Option<String> => "numeric",
        created_at: Option<NaiveDateTime>,
        updated_at: Option<NaiveDateTime>,
    }

    ReferredUser => "referred_users" {
        id: i32,
        referral_id: i32,
        referred_wallet_address: String,
        joined_at: Option<NaiveDateTime>,
        status: String,
        earned_rewards: Option<String> => "numeric",
        apr_boost: Option<String> => "numeric",
    }

    /// Landing page prospects.
    Lead => "leads" {
        id: i32,
        full_name: String,
        email: String,
        phone: Option<String>,
        company: Option<String>,
        investment_size: String,
        message: Option<String>,
        consent_given: Option<bool>,
        created_at: Option<NaiveDateTime>,
        updated_at: Option<NaiveDateTime>,
        status: Option<String> => "lead_status",
        assigned_to: Option<String>,
        notes: Option<String>,
        source: Option<String>,
        follow_up_date: Option<NaiveDateTime>,
        last_contact: Option<NaiveDateTime>,
        language_preference: Option<String>,
        original_referrer: Option<String>,
        additional_data: Option<Value>,
    }

    ManagedNft => "managed_nfts" {
        id: i32,
        network: String,
        version: String,
        token_id: String,
        contract_address: Option<String>,
        token0_symbol: Option<String>,
        token1_symbol: Option<String>,
        value_usdc: Option<String> => "numeric",
        status: Option<String> => "nft_status",
        fee_tier: Option<String>,
        pool_address: Option<String>,
        image_url: Option<String>,
        additional_data: Option<Value>,
        created_at: Option<NaiveDateTime>,
        updated_at: Option<NaiveDateTime>,
        created_by: Option<String>,
    }
}
