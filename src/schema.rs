use crate::error::ConfigError;

/// The declared type of a column, `ts` excepted (`ts` is always `Integer` and implicit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        match text.to_ascii_uppercase().as_str() {
            "INTEGER" => Ok(ColumnType::Integer),
            "TEXT" => Ok(ColumnType::Text),
            other => Err(ConfigError::UnknownColumnType(other.to_string())),
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
        }
    }
}

/// A single declared column, `name` and `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
}

/// A table's full column list, with the implicit `ts` column always at position 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Includes the implicit `ts` column at index 0.
    columns: Vec<ColumnSpec>,
}

impl Schema {
    /// Builds a schema from the user-declared columns (not including `ts`, which is prepended
    /// automatically).
    pub fn new(declared: Vec<ColumnSpec>) -> Self {
        let mut columns = Vec::with_capacity(declared.len() + 1);
        columns.push(ColumnSpec {
            name: "ts".to_string(),
            ty: ColumnType::Integer,
        });
        columns.extend(declared);
        Schema { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        false // ts is always present
    }

    /// Renders the `CREATE TABLE` DDL `declare_vtab` expects, e.g.
    /// `CREATE TABLE x(ts INTEGER, value TEXT);`. SQLite ignores the table-name token in this
    /// string, so the placeholder `x` is used literally rather than the real table name.
    pub fn declare_ddl(&self) -> String {
        let cols = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.ty.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE x({cols});")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn ts_is_always_first_and_integer() {
        let schema = Schema::new(vec![ColumnSpec {
            name: "value".to_string(),
            ty: ColumnType::Text,
        }]);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.columns()[0].name, "ts");
        assert_eq!(schema.columns()[0].ty, ColumnType::Integer);
    }

    #[test]
    fn declare_ddl_renders_all_columns() {
        let schema = Schema::new(vec![ColumnSpec {
            name: "value".to_string(),
            ty: ColumnType::Text,
        }]);
        assert_eq!(
            schema.declare_ddl(),
            "CREATE TABLE x(ts INTEGER, value TEXT);"
        );
    }

    #[test_case("INTEGER", ColumnType::Integer; "integer")]
    #[test_case("integer", ColumnType::Integer; "lowercase integer")]
    #[test_case("TEXT", ColumnType::Text; "text")]
    #[test_case("Text", ColumnType::Text; "mixed case text")]
    fn column_type_parse_accepts_known_types(text: &str, expected: ColumnType) {
        assert_eq!(ColumnType::parse(text).unwrap(), expected);
    }

    #[test]
    fn column_type_parse_rejects_unknown_types() {
        assert!(ColumnType::parse("BLOB").is_err());
    }
}
