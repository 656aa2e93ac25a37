use serde_json::Value;
use std::fmt;

/// Parsed argument: a quoted string, or a bare token (integer when it parses as one).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    Text(String),
    Int(i64),
}

impl Arg {
    pub fn text(&self) -> String {
        match self {
            Arg::Text(s) => s.clone(),
            Arg::Int(n) => n.to_string(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(n) => Some(*n),
            Arg::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Arg::Text(s) => Value::String(s.clone()),
            Arg::Int(n) => Value::Number((*n).into()),
        }
    }
}

/// `column` or `alias.column`. `raw` is what the caller typed, used as the error key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRef {
    pub alias: Option<String>,
    pub column: String,
    pub raw: String,
}

impl ColumnRef {
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        let parts: Vec<&str> = s.split('.').map(str::trim).collect();
        let (alias, column) = match parts.as_slice() {
            [column] => (None, *column),
            [alias, column] => (Some(alias.to_string()), *column),
            _ => return None,
        };
        if column.is_empty() || alias.as_deref() == Some("") {
            return None;
        }
        Some(ColumnRef {
            alias,
            column: column.to_string(),
            raw: s.to_string(),
        })
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(a) => write!(f, "{}.{}", a, self.column),
            None => f.write_str(&self.column),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Lte,
    Gte,
    Lt,
    Gt,
    Like,
}

impl Operator {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "=" => Some(Operator::Eq),
            "<=" => Some(Operator::Lte),
            ">=" => Some(Operator::Gte),
            "<" => Some(Operator::Lt),
            ">" => Some(Operator::Gt),
            "like" => Some(Operator::Like),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Like => "ILIKE",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinSpec {
    pub table: String,
    pub alias: String,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhereSpec {
    pub column: ColumnRef,
    pub op: Operator,
    pub value: Arg,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderSpec {
    pub column: ColumnRef,
    pub dir: Direction,
}

/// Validated shape of a query expression. Nothing here has been checked against a schema yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuerySpec {
    pub table: String,
    pub alias: String,
    pub select: Vec<ColumnRef>,
    pub joins: Vec<JoinSpec>,
    pub wheres: Vec<WhereSpec>,
    pub order_by: Vec<OrderSpec>,
    pub limit: Option<i64>,
}

impl QuerySpec {
    /// Base table followed by joined tables, in order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.table.as_str()).chain(self.joins.iter().map(|j| j.table.as_str()))
    }
}

/// `name`, `name alias` or `name as alias`. A bare name is its own alias.
pub(crate) fn parse_table_and_alias(raw: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    match parts.as_slice() {
        [table] => Some((table.to_string(), table.to_string())),
        [table, alias] => Some((table.to_string(), alias.to_string())),
        [table, kw, alias] if kw.eq_ignore_ascii_case("as") => Some((table.to_string(), alias.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn column_refs() {
        let c = ColumnRef::parse(" h.nama ").unwrap();
        assert_eq!(c.alias.as_deref(), Some("h"));
        assert_eq!(c.column, "nama");
        assert_eq!(c.raw, "h.nama");
        assert_eq!(ColumnRef::parse("nama").unwrap().alias, None);
        assert!(ColumnRef::parse("a.b.c").is_none());
        assert!(ColumnRef::parse(".b").is_none());
        assert!(ColumnRef::parse("  ").is_none());
    }

    #[test]
    fn table_alias_forms() {
        assert_eq!(parse_table_and_alias("harga"), Some(("harga".into(), "harga".into())));
        assert_eq!(parse_table_and_alias("harga h"), Some(("harga".into(), "h".into())));
        assert_eq!(parse_table_and_alias("harga AS h"), Some(("harga".into(), "h".into())));
        assert_eq!(parse_table_and_alias("harga is h"), None);
        assert_eq!(parse_table_and_alias(""), None);
    }

    #[test]
    fn operators_are_case_insensitive() {
        assert_eq!(Operator::parse("LIKE"), Some(Operator::Like));
        assert_eq!(Operator::parse(" >= "), Some(Operator::Gte));
        assert_eq!(Operator::parse("!="), None);
    }
}
