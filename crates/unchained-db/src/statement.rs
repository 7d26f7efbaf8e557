//! SQL statement builders.
//!
//! Builders render parameterized SQLite statements. Predicates come from a
//! [`Specification`]: its `query()` is spliced in as the `WHERE` clause and
//! its `values()` are bound positionally after any `SET`/`VALUES` values.

use itertools::Itertools;
use unchained_core::{specification::is_identifier, Specification, Value};

use crate::error::{RepositoryError, RepositoryResult};

/// A rendered statement and its positional bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    values: Vec<Value>,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.values)
    }
}

// ============================================================================
// SAVE OPTIONS
// ============================================================================

/// Options applied to an insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    on_conflict: Option<OnConflict>,
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn the insert into an upsert: on a conflict over `target`, overwrite
    /// `columns` with the incoming values. No columns means `DO NOTHING`.
    pub fn on_conflict<T, C>(mut self, target: T, columns: C) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        self.on_conflict = Some(OnConflict {
            target: target.into_iter().map(Into::into).collect(),
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub const fn conflict(&self) -> Option<&OnConflict> {
        self.on_conflict.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnConflict {
    target: Vec<String>,
    columns: Vec<String>,
}

impl OnConflict {
    pub fn target(&self) -> &[String] {
        &self.target
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn render(&self) -> RepositoryResult<String> {
        if self.target.is_empty() {
            return Err(RepositoryError::invalid_input(
                "conflict target requires at least one column",
            ));
        }
        check_identifiers(self.target.iter().chain(&self.columns))?;

        let target = self.target.join(", ");
        if self.columns.is_empty() {
            return Ok(format!(" ON CONFLICT ({target}) DO NOTHING"));
        }
        let set = self
            .columns
            .iter()
            .map(|column| format!("{column} = excluded.{column}"))
            .join(", ");
        Ok(format!(" ON CONFLICT ({target}) DO UPDATE SET {set}"))
    }
}

fn check_identifiers<'a>(names: impl IntoIterator<Item = &'a String>) -> RepositoryResult<()> {
    names
        .into_iter()
        .find(|name| !is_identifier(name))
        .map_or(Ok(()), |name| {
            Err(RepositoryError::invalid_input(format!(
                "invalid column identifier: {name:?}"
            )))
        })
}

fn where_clause(filter: Option<&Specification>) -> RepositoryResult<(String, Vec<Value>)> {
    match filter {
        Some(spec) => {
            spec.validate()?;
            Ok((format!(" WHERE {}", spec.query()), spec.values()))
        }
        None => Ok((String::new(), Vec::new())),
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

#[derive(Debug, Clone)]
pub struct Insert<'a> {
    table: &'a str,
    columns: Vec<&'a str>,
    values: Vec<Value>,
    on_conflict: Option<&'a OnConflict>,
    returning: Option<&'a str>,
}

impl<'a> Insert<'a> {
    pub const fn table(table: &'a str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            values: Vec::new(),
            on_conflict: None,
            returning: None,
        }
    }

    pub fn value(mut self, column: &'a str, value: Value) -> Self {
        self.columns.push(column);
        self.values.push(value);
        self
    }

    pub fn options(mut self, options: &'a SaveOptions) -> Self {
        self.on_conflict = options.conflict();
        self
    }

    pub const fn returning(mut self, column: &'a str) -> Self {
        self.returning = Some(column);
        self
    }

    pub fn build(self) -> RepositoryResult<Statement> {
        let mut sql = if self.columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.table)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table,
                self.columns.iter().join(", "),
                itertools::repeat_n("?", self.columns.len()).join(", ")
            )
        };
        if let Some(conflict) = self.on_conflict {
            sql.push_str(&conflict.render()?);
        }
        if let Some(column) = self.returning {
            sql.push_str(" RETURNING ");
            sql.push_str(column);
        }
        Ok(Statement {
            sql,
            values: self.values,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Select<'a> {
    table: &'a str,
    filter: Option<&'a Specification>,
    order_by: Option<&'a str>,
}

impl<'a> Select<'a> {
    pub const fn table(table: &'a str) -> Self {
        Self {
            table,
            filter: None,
            order_by: None,
        }
    }

    pub const fn filter(mut self, filter: Option<&'a Specification>) -> Self {
        self.filter = filter;
        self
    }

    pub const fn order_by(mut self, column: &'a str) -> Self {
        self.order_by = Some(column);
        self
    }

    pub fn build(self) -> RepositoryResult<Statement> {
        let (clause, values) = where_clause(self.filter)?;
        let mut sql = format!("SELECT * FROM {}{clause}", self.table);
        if let Some(column) = self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(column);
        }
        Ok(Statement { sql, values })
    }
}

#[derive(Debug, Clone)]
pub struct Update<'a> {
    table: &'a str,
    columns: Vec<&'a str>,
    values: Vec<Value>,
    filter: Option<&'a Specification>,
    returning_all: bool,
}

impl<'a> Update<'a> {
    pub const fn table(table: &'a str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            values: Vec::new(),
            filter: None,
            returning_all: false,
        }
    }

    pub fn set(mut self, column: &'a str, value: Value) -> Self {
        self.columns.push(column);
        self.values.push(value);
        self
    }

    pub const fn filter(mut self, filter: &'a Specification) -> Self {
        self.filter = Some(filter);
        self
    }

    pub const fn returning_all(mut self) -> Self {
        self.returning_all = true;
        self
    }

    /// Fails without a `SET` column or without a filter; unfiltered updates
    /// are never rendered.
    pub fn build(self) -> RepositoryResult<Statement> {
        if self.columns.is_empty() {
            return Err(RepositoryError::invalid_input("nothing to update"));
        }
        let Some(filter) = self.filter else {
            return Err(RepositoryError::invalid_input("UPDATE requires a filter"));
        };
        let (clause, filter_values) = where_clause(Some(filter))?;
        let set = self.columns.iter().map(|c| format!("{c} = ?")).join(", ");
        let mut sql = format!("UPDATE {} SET {set}{clause}", self.table);
        if self.returning_all {
            sql.push_str(" RETURNING *");
        }
        let mut values = self.values;
        values.extend(filter_values);
        Ok(Statement { sql, values })
    }
}

#[derive(Debug, Clone)]
pub struct Delete<'a> {
    table: &'a str,
    filter: Option<&'a Specification>,
}

impl<'a> Delete<'a> {
    pub const fn table(table: &'a str) -> Self {
        Self {
            table,
            filter: None,
        }
    }

    pub const fn filter(mut self, filter: &'a Specification) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Fails without a filter; unfiltered deletes are never rendered.
    pub fn build(self) -> RepositoryResult<Statement> {
        let Some(filter) = self.filter else {
            return Err(RepositoryError::invalid_input("DELETE requires a filter"));
        };
        let (clause, values) = where_clause(Some(filter))?;
        Ok(Statement {
            sql: format!("DELETE FROM {}{clause}", self.table),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_insert_with_returning() {
        let stmt = Insert::table("accounts")
            .value("username", json!("ada"))
            .value("age", json!(36))
            .returning("id")
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "INSERT INTO accounts (username, age) VALUES (?, ?) RETURNING id"
        );
        assert_eq!(stmt.values(), [json!("ada"), json!(36)]);
    }

    #[test]
    fn test_insert_without_columns_uses_defaults() {
        let stmt = Insert::table("events").build().unwrap();
        assert_eq!(stmt.sql(), "INSERT INTO events DEFAULT VALUES");
    }

    #[test]
    fn test_insert_on_conflict_update() {
        let options = SaveOptions::new().on_conflict(["username"], ["age", "status"]);
        let stmt = Insert::table("accounts")
            .value("username", json!("ada"))
            .options(&options)
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "INSERT INTO accounts (username) VALUES (?) \
             ON CONFLICT (username) DO UPDATE SET age = excluded.age, status = excluded.status"
        );
    }

    #[test]
    fn test_insert_on_conflict_do_nothing() {
        let options = SaveOptions::new().on_conflict(["username"], Vec::<String>::new());
        let stmt = Insert::table("accounts")
            .value("username", json!("ada"))
            .options(&options)
            .build()
            .unwrap();
        assert!(stmt.sql().ends_with("ON CONFLICT (username) DO NOTHING"));
    }

    #[test]
    fn test_on_conflict_rejects_bad_identifier() {
        let options = SaveOptions::new().on_conflict(["name; DROP TABLE x"], ["age"]);
        let result = Insert::table("accounts").options(&options).build();
        assert!(matches!(result, Err(RepositoryError::InvalidInput(_))));
    }

    #[test]
    fn test_select_with_specification() {
        let spec = Specification::and([
            Specification::equal("age", 30),
            Specification::is_in("status", ["active", "pending"]).unwrap(),
        ])
        .unwrap();
        let stmt = Select::table("accounts")
            .filter(Some(&spec))
            .order_by("id")
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT * FROM accounts WHERE age = ? AND status IN (?,?) ORDER BY id"
        );
        assert_eq!(stmt.values(), [json!(30), json!("active"), json!("pending")]);
    }

    #[test]
    fn test_select_all() {
        let stmt = Select::table("accounts").build().unwrap();
        assert_eq!(stmt.sql(), "SELECT * FROM accounts");
        assert!(stmt.values().is_empty());
    }

    #[test]
    fn test_select_rejects_invalid_field() {
        let spec = Specification::equal("1=1 OR x", 1);
        let result = Select::table("accounts").filter(Some(&spec)).build();
        assert!(matches!(result, Err(RepositoryError::Specification(_))));
    }

    #[test]
    fn test_update_binds_set_values_before_filter() {
        let spec = Specification::equal("id", 9);
        let stmt = Update::table("accounts")
            .set("age", json!(40))
            .filter(&spec)
            .returning_all()
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "UPDATE accounts SET age = ? WHERE id = ? RETURNING *"
        );
        assert_eq!(stmt.values(), [json!(40), json!(9)]);
    }

    #[test]
    fn test_update_requires_filter_and_columns() {
        let spec = Specification::equal("id", 1);
        assert!(Update::table("accounts").filter(&spec).build().is_err());
        assert!(Update::table("accounts").set("age", json!(1)).build().is_err());
    }

    #[test]
    fn test_delete_requires_filter() {
        assert!(Delete::table("accounts").build().is_err());
        let spec = Specification::equal("id", 3);
        let stmt = Delete::table("accounts").filter(&spec).build().unwrap();
        assert_eq!(stmt.sql(), "DELETE FROM accounts WHERE id = ?");
    }
}
