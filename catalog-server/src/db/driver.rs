//! Store drivers and the SQL dialect each one needs
//!
//! Connections go through `sqlx::any`, so the wire protocol is picked from the
//! URL scheme at runtime. What still differs per driver is the SQL text:
//! placeholder syntax, how generated keys come back, and which casts keep
//! decimals and timestamps exact when read through the `Any` value model.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::Serialize;

/// A driver the catalog knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Postgres,
    MySql,
    Sqlite,
}

/// How the store hands back the id it generated on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// `INSERT ... RETURNING id`; no returned row means nothing was inserted.
    Returning,
    /// `rows_affected()` plus `last_insert_id()` from the execute result.
    LastInsertId,
}

/// Driver identifier that doesn't name a compiled-in driver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown driver '{0}' (expected postgres, mysql, or sqlite)")]
pub struct UnknownDriver(pub String);

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// URL schemes served by this driver.
    pub fn schemes(&self) -> &'static [&'static str] {
        match self {
            Self::Postgres => &["postgres", "postgresql"],
            Self::MySql => &["mysql", "mariadb"],
            Self::Sqlite => &["sqlite"],
        }
    }

    /// Infer the driver from a connection URL's scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url_scheme(url)?;
        [Self::Postgres, Self::MySql, Self::Sqlite]
            .into_iter()
            .find(|d| d.schemes().contains(&scheme.as_str()))
    }

    /// Whether `url` can be opened by this driver.
    pub fn accepts_url(&self, url: &str) -> bool {
        Self::from_url(url) == Some(*self)
    }

    /// Embedded drivers open a file or memory database; credentials don't apply.
    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Sqlite)
    }

    /// Positional parameter marker for the `n`th (1-based) bind value.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${}", n),
            Self::MySql | Self::Sqlite => "?".to_string(),
        }
    }

    pub fn key_strategy(&self) -> KeyStrategy {
        match self {
            Self::Postgres | Self::Sqlite => KeyStrategy::Returning,
            Self::MySql => KeyStrategy::LastInsertId,
        }
    }

    /// Product table statements for this dialect.
    pub fn statements(&self) -> &'static ProductStatements {
        match self {
            Self::Postgres => &POSTGRES_STATEMENTS,
            Self::MySql => &MYSQL_STATEMENTS,
            Self::Sqlite => &SQLITE_STATEMENTS,
        }
    }

    /// DDL for the products table, used to bootstrap an empty store.
    pub fn products_ddl(&self) -> &'static str {
        match self {
            Self::Postgres => {
                r#"
                CREATE TABLE IF NOT EXISTS products (
                    id BIGSERIAL PRIMARY KEY,
                    name VARCHAR(255) NOT NULL,
                    description TEXT,
                    price NUMERIC(12, 2) NOT NULL,
                    quantity INTEGER NOT NULL,
                    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                )
                "#
            }
            Self::MySql => {
                r#"
                CREATE TABLE IF NOT EXISTS products (
                    id BIGINT AUTO_INCREMENT PRIMARY KEY,
                    name VARCHAR(255) NOT NULL,
                    description TEXT,
                    price DECIMAL(12, 2) NOT NULL,
                    quantity INT NOT NULL,
                    created_at TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP
                )
                "#
            }
            // Price is TEXT so SQLite's numeric affinity can't turn it into a float.
            Self::Sqlite => {
                r#"
                CREATE TABLE IF NOT EXISTS products (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT,
                    price TEXT NOT NULL,
                    quantity INTEGER NOT NULL,
                    created_at TEXT DEFAULT CURRENT_TIMESTAMP
                )
                "#
            }
        }
    }

    fn text_type(&self) -> &'static str {
        match self {
            Self::Postgres | Self::Sqlite => "TEXT",
            Self::MySql => "CHAR",
        }
    }

    fn bigint_type(&self) -> &'static str {
        match self {
            Self::Postgres => "BIGINT",
            Self::MySql => "SIGNED",
            Self::Sqlite => "INTEGER",
        }
    }

    /// Bind marker for a decimal sent as text.
    fn decimal_param(&self, n: usize) -> String {
        match self {
            Self::Postgres => format!("CAST({} AS NUMERIC)", self.placeholder(n)),
            Self::MySql | Self::Sqlite => self.placeholder(n),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Driver {
    type Err = UnknownDriver;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(UnknownDriver(s.to_owned())),
        }
    }
}

fn url_scheme(url: &str) -> Option<String> {
    let (scheme, _) = url.split_once(':')?;
    if scheme.is_empty() {
        return None;
    }
    Some(scheme.to_ascii_lowercase())
}

/// SQL text for every product operation in one dialect
#[derive(Debug)]
pub struct ProductStatements {
    pub insert: String,
    pub select_all: String,
    pub select_by_id: String,
    pub update: String,
    pub delete: String,
}

impl ProductStatements {
    fn build(driver: Driver) -> Self {
        let p = |n| driver.placeholder(n);
        let text = driver.text_type();

        // Reads go through text so NUMERIC and TIMESTAMP survive the Any value model.
        let columns = format!(
            "id, name, description, CAST(price AS {text}) AS price, \
             CAST(quantity AS {bigint}) AS quantity, CAST(created_at AS {text}) AS created_at",
            text = text,
            bigint = driver.bigint_type(),
        );
        let select_all = format!("SELECT {} FROM products", columns);

        let mut insert = format!(
            "INSERT INTO products (name, description, price, quantity) VALUES ({}, {}, {}, {})",
            p(1),
            p(2),
            driver.decimal_param(3),
            p(4),
        );
        if driver.key_strategy() == KeyStrategy::Returning {
            insert.push_str(" RETURNING id");
        }

        Self {
            insert,
            select_by_id: format!("{} WHERE id = {}", select_all, p(1)),
            select_all,
            update: format!(
                "UPDATE products SET name = {}, description = {}, price = {}, quantity = {} WHERE id = {}",
                p(1),
                p(2),
                driver.decimal_param(3),
                p(4),
                p(5),
            ),
            delete: format!("DELETE FROM products WHERE id = {}", p(1)),
        }
    }
}

static POSTGRES_STATEMENTS: Lazy<ProductStatements> =
    Lazy::new(|| ProductStatements::build(Driver::Postgres));
static MYSQL_STATEMENTS: Lazy<ProductStatements> =
    Lazy::new(|| ProductStatements::build(Driver::MySql));
static SQLITE_STATEMENTS: Lazy<ProductStatements> =
    Lazy::new(|| ProductStatements::build(Driver::Sqlite));
