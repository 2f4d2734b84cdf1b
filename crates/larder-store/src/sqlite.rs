// SPDX-License-Identifier: Apache-2.0

use crate::StoreError;
use larder_model::{
    now_timestamp, FoodItem, FoodQuantity, NewFoodItem, NewRawMaterial, RawMaterial, RawQuantity,
};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: i64 = 1;
pub const BUSY_TIMEOUT_MS: i64 = 5_000;

const RAW_MATERIAL_TABLE: &str = "raw_material";
const FOOD_ITEM_TABLE: &str = "food_item";

/// Handle to the backing database file. Cheap to clone; every operation
/// opens its own connection, so concurrent writers serialize inside SQLite
/// rather than behind an application lock.
#[derive(Debug, Clone)]
pub struct Store {
    db_path: PathBuf,
}

impl Store {
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Creates both stock tables when missing and switches the database to
    /// WAL so readers do not block the single writer.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.open()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            CREATE TABLE IF NOT EXISTS raw_material (
              id INTEGER PRIMARY KEY,
              name TEXT NOT NULL,
              quantity REAL NOT NULL,
              unit TEXT NOT NULL,
              last_updated TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS food_item (
              id INTEGER PRIMARY KEY,
              name TEXT NOT NULL,
              quantity INTEGER NOT NULL,
              category TEXT NOT NULL,
              last_updated TEXT NOT NULL
            );
            ",
        )?;
        conn.execute_batch(&format!("PRAGMA user_version={SCHEMA_VERSION};"))?;
        Ok(())
    }

    fn open(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(&format!("PRAGMA busy_timeout={BUSY_TIMEOUT_MS};"))?;
        Ok(conn)
    }

    pub fn list_raw_materials(&self) -> Result<Vec<RawMaterial>, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, quantity, unit, last_updated FROM raw_material ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RawMaterial::new(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_raw_material(&self, id: i64) -> Result<RawMaterial, StoreError> {
        let conn = self.open()?;
        fetch_raw_material(&conn, id)
    }

    pub fn create_raw_material(&self, new: &NewRawMaterial) -> Result<RawMaterial, StoreError> {
        let conn = self.open()?;
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO raw_material (name, quantity, unit, last_updated) VALUES (?1, ?2, ?3, ?4)",
            params![new.name.as_str(), new.quantity.value(), new.unit.as_str(), now],
        )?;
        fetch_raw_material(&conn, conn.last_insert_rowid())
    }

    pub fn replace_raw_material_quantity(
        &self,
        id: i64,
        quantity: RawQuantity,
    ) -> Result<RawMaterial, StoreError> {
        let conn = self.open()?;
        let now = now_timestamp();
        let affected = conn.execute(
            "UPDATE raw_material SET quantity = ?1, last_updated = ?2 WHERE id = ?3",
            params![quantity.value(), now, id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        fetch_raw_material(&conn, id)
    }

    /// Applies `delta` iff the result stays non-negative. The check and the
    /// write are one UPDATE, so two concurrent withdrawals can never both
    /// pass a stale read; SQLite evaluates the predicate at write time.
    pub fn adjust_raw_material(&self, id: i64, delta: f64) -> Result<RawMaterial, StoreError> {
        let conn = self.open()?;
        let now = now_timestamp();
        let affected = conn.execute(
            "UPDATE raw_material SET quantity = quantity + ?1, last_updated = ?2 \
             WHERE id = ?3 AND quantity + ?1 >= 0",
            params![delta, now, id],
        )?;
        if affected == 1 {
            return fetch_raw_material(&conn, id);
        }
        if row_exists(&conn, RAW_MATERIAL_TABLE, id)? {
            Err(StoreError::InsufficientQuantity)
        } else {
            Err(StoreError::NotFound)
        }
    }

    pub fn delete_raw_material(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.open()?;
        let affected = conn.execute("DELETE FROM raw_material WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn list_food_items(&self) -> Result<Vec<FoodItem>, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, quantity, category, last_updated FROM food_item ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FoodItem::new(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_food_item(&self, id: i64) -> Result<FoodItem, StoreError> {
        let conn = self.open()?;
        fetch_food_item(&conn, id)
    }

    pub fn create_food_item(&self, new: &NewFoodItem) -> Result<FoodItem, StoreError> {
        let conn = self.open()?;
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO food_item (name, quantity, category, last_updated) VALUES (?1, ?2, ?3, ?4)",
            params![
                new.name.as_str(),
                new.quantity.as_i64(),
                new.category.as_str(),
                now
            ],
        )?;
        fetch_food_item(&conn, conn.last_insert_rowid())
    }

    pub fn replace_food_item_quantity(
        &self,
        id: i64,
        quantity: FoodQuantity,
    ) -> Result<FoodItem, StoreError> {
        let conn = self.open()?;
        let now = now_timestamp();
        let affected = conn.execute(
            "UPDATE food_item SET quantity = ?1, last_updated = ?2 WHERE id = ?3",
            params![quantity.as_i64(), now, id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        fetch_food_item(&conn, id)
    }

    /// Integer counterpart of [`Store::adjust_raw_material`]; same
    /// conditional-write contract.
    pub fn adjust_food_item(&self, id: i64, delta: i64) -> Result<FoodItem, StoreError> {
        let conn = self.open()?;
        let now = now_timestamp();
        let affected = conn.execute(
            "UPDATE food_item SET quantity = quantity + ?1, last_updated = ?2 \
             WHERE id = ?3 AND quantity + ?1 >= 0",
            params![delta, now, id],
        )?;
        if affected == 1 {
            return fetch_food_item(&conn, id);
        }
        if row_exists(&conn, FOOD_ITEM_TABLE, id)? {
            Err(StoreError::InsufficientQuantity)
        } else {
            Err(StoreError::NotFound)
        }
    }

    pub fn delete_food_item(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.open()?;
        let affected = conn.execute("DELETE FROM food_item WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn fetch_raw_material(conn: &Connection, id: i64) -> Result<RawMaterial, StoreError> {
    conn.query_row(
        "SELECT id, name, quantity, unit, last_updated FROM raw_material WHERE id = ?1",
        params![id],
        |row| {
            Ok(RawMaterial::new(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        },
    )
    .map_err(StoreError::from)
}

fn fetch_food_item(conn: &Connection, id: i64) -> Result<FoodItem, StoreError> {
    conn.query_row(
        "SELECT id, name, quantity, category, last_updated FROM food_item WHERE id = ?1",
        params![id],
        |row| {
            Ok(FoodItem::new(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        },
    )
    .map_err(StoreError::from)
}

/// Splits the two zero-row outcomes of a conditional write: a missing row
/// versus a row the predicate refused.
fn row_exists(conn: &Connection, table: &str, id: i64) -> Result<bool, StoreError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    conn.query_row(&sql, params![id], |row| row.get::<_, i64>(0))
        .map(|v| v != 0)
        .map_err(StoreError::from)
}
