//! Per-family SQL text.
//!
//! MySQL and PostgreSQL agree on `SELECT ... FOR UPDATE` but not on parameter
//! placeholders, so each family gets its own [`SqlDialect`]. The [`Backend`]
//! selected at startup picks one (or the in-process store, which has no SQL).

use std::fmt::{self, Display};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Name of the table holding the counters.
pub const TABLE: &str = "sequences";

/// Datastore family the harness runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "lowercase"))]
pub enum Backend {
    #[default]
    MySql,
    Postgres,
    /// In-process rows, see [`MemoryStore`](super::memory::MemoryStore).
    Memory,
}

impl Backend {
    /// SQL text for this family, `None` for [`Backend::Memory`].
    pub fn dialect(self) -> Option<&'static dyn SqlDialect> {
        match self {
            Backend::MySql => Some(&MySqlDialect),
            Backend::Postgres => Some(&PostgresDialect),
            Backend::Memory => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::MySql => "mysql",
            Backend::Postgres => "postgres",
            Backend::Memory => "memory",
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Backend::MySql),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "memory" => Ok(Backend::Memory),
            other => Err(format!(
                "unknown db server {other:?} (expected mysql, postgres or memory)"
            )),
        }
    }
}

/// Statements one datastore family needs.
pub trait SqlDialect: Send + Sync {
    /// Family name, for logs.
    fn name(&self) -> &'static str;

    /// Locks one row and reads its counter. Binds: id.
    fn lock_counter(&self) -> &'static str;

    /// Overwrites one counter. Binds: counter, id.
    fn write_counter(&self) -> &'static str;

    /// Inserts one zeroed row. Binds: id.
    fn insert_record(&self) -> &'static str;

    fn select_ids(&self) -> &'static str {
        "SELECT id FROM sequences ORDER BY id"
    }

    fn select_records(&self) -> &'static str {
        "SELECT id, counter FROM sequences ORDER BY id"
    }

    fn drop_table(&self) -> &'static str {
        "DROP TABLE IF EXISTS sequences"
    }

    fn create_table(&self) -> &'static str {
        "CREATE TABLE sequences (id varchar(36), counter bigint, PRIMARY KEY (id))"
    }
}

/// `?` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn lock_counter(&self) -> &'static str {
        "SELECT counter FROM sequences WHERE id = ? FOR UPDATE"
    }

    fn write_counter(&self) -> &'static str {
        "UPDATE sequences SET counter = ? WHERE id = ?"
    }

    fn insert_record(&self) -> &'static str {
        "INSERT INTO sequences (id, counter) VALUES (?, 0)"
    }
}

/// `$n` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn lock_counter(&self) -> &'static str {
        "SELECT counter FROM sequences WHERE id = $1 FOR UPDATE"
    }

    fn write_counter(&self) -> &'static str {
        "UPDATE sequences SET counter = $1 WHERE id = $2"
    }

    fn insert_record(&self) -> &'static str {
        "INSERT INTO sequences (id, counter) VALUES ($1, 0)"
    }
}
