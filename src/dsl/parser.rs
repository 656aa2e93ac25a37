use crate::dsl::spec::{parse_table_and_alias, Arg, ColumnRef, Direction, JoinSpec, Operator, OrderSpec, QuerySpec, WhereSpec};
use crate::error::AppError;

/// Parse a chained expression such as
/// `table('harga as h')->select('h.nama')->where('h.harga','>=',100)->orderby('h.nama','asc')->take(10)`.
///
/// Only shape is checked here; tables and columns are validated by the builder.
pub fn parse_query(raw: &str) -> Result<QuerySpec, AppError> {
    let q = raw.trim();
    if q.is_empty() {
        return Err(AppError::validation("query", "required"));
    }

    let mut spec = QuerySpec::default();
    for (i, seg) in split_segments(q).into_iter().enumerate() {
        let seg = seg.trim();
        if seg.is_empty() {
            continue;
        }
        let (name, args) = parse_call(seg)
            .ok_or_else(|| AppError::validation("query", format!("invalid segment {}: {}", i, seg)))?;

        match name.to_lowercase().as_str() {
            "table" => {
                let [arg] = args.as_slice() else {
                    return Err(AppError::validation("table", "expects 1 argument"));
                };
                let (table, alias) =
                    parse_table_and_alias(&arg.text()).ok_or_else(|| AppError::validation("table", "invalid"))?;
                spec.table = table;
                spec.alias = alias;
            }
            "select" => {
                if args.is_empty() {
                    return Err(AppError::validation("select", "empty"));
                }
                spec.select = args
                    .iter()
                    .map(|a| ColumnRef::parse(&a.text()).ok_or_else(|| AppError::validation("select", "invalid column")))
                    .collect::<Result<_, _>>()?;
            }
            "join" => {
                let [table, left, op, right] = args.as_slice() else {
                    return Err(AppError::validation("join", "expects 4 arguments"));
                };
                let (table, alias) =
                    parse_table_and_alias(&table.text()).ok_or_else(|| AppError::validation("join", "invalid table"))?;
                let left = ColumnRef::parse(&left.text()).ok_or_else(|| AppError::validation("join", "invalid left"))?;
                if op.text().trim() != "=" {
                    return Err(AppError::validation("join", "only '=' supported"));
                }
                let right = ColumnRef::parse(&right.text()).ok_or_else(|| AppError::validation("join", "invalid right"))?;
                spec.joins.push(JoinSpec { table, alias, left, right });
            }
            "where" => {
                let (column, op, value) = match args.as_slice() {
                    [column, value] => (column, Operator::Eq, value),
                    [column, op, value] => {
                        let op = Operator::parse(&op.text())
                            .ok_or_else(|| AppError::validation("where", "unsupported operator"))?;
                        (column, op, value)
                    }
                    _ => return Err(AppError::validation("where", "expects 2 or 3 arguments")),
                };
                let column =
                    ColumnRef::parse(&column.text()).ok_or_else(|| AppError::validation("where", "invalid field"))?;
                spec.wheres.push(WhereSpec {
                    column,
                    op,
                    value: value.clone(),
                });
            }
            "orderby" => {
                let [column, dir] = args.as_slice() else {
                    return Err(AppError::validation("orderby", "expects 2 arguments"));
                };
                let column =
                    ColumnRef::parse(&column.text()).ok_or_else(|| AppError::validation("orderby", "invalid field"))?;
                let dir = Direction::parse(&dir.text())
                    .ok_or_else(|| AppError::validation("orderby", "dir must be asc or desc"))?;
                spec.order_by.push(OrderSpec { column, dir });
            }
            "take" => {
                let [n] = args.as_slice() else {
                    return Err(AppError::validation("take", "expects 1 argument"));
                };
                match n.as_int() {
                    Some(n) if n > 0 => spec.limit = Some(n),
                    _ => return Err(AppError::validation("take", "invalid")),
                }
            }
            _ => {
                return Err(AppError::validation(
                    "query",
                    format!("unsupported method at segment {}: {}", i, seg),
                ))
            }
        }
    }

    if spec.table.is_empty() {
        return Err(AppError::validation("table", "required"));
    }
    Ok(spec)
}

/// Split on `->` outside single-quoted literals.
fn split_segments(q: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    let bytes = q.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_quote = !in_quote,
            b'-' if !in_quote && bytes.get(i + 1) == Some(&b'>') => {
                out.push(&q[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    out.push(&q[start..]);
    out
}

/// `name(args)`; nothing but whitespace may follow the closing parenthesis.
fn parse_call(seg: &str) -> Option<(&str, Vec<Arg>)> {
    let open = seg.find('(')?;
    let close = seg.rfind(')')?;
    if open == 0 || close <= open || !seg[close + 1..].trim().is_empty() {
        return None;
    }
    let name = seg[..open].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let args = parse_args(&seg[open + 1..close])?;
    Some((name, args))
}

fn parse_args(inner: &str) -> Option<Vec<Arg>> {
    let mut args = Vec::new();
    let mut s = inner.trim();
    while !s.is_empty() {
        if let Some(rest) = s.strip_prefix('\'') {
            let end = rest.find('\'')?;
            args.push(Arg::Text(rest[..end].to_string()));
            s = rest[end + 1..].trim_start();
            // Only a separator may follow a quoted literal.
            match s.strip_prefix(',') {
                Some(after) => s = after.trim_start(),
                None if s.is_empty() => {}
                None => return None,
            }
        } else {
            let (token, rest) = match s.find(',') {
                Some(end) => (s[..end].trim(), s[end + 1..].trim_start()),
                None => (s.trim(), ""),
            };
            s = rest;
            if token.is_empty() {
                continue;
            }
            args.push(match token.parse::<i64>() {
                Ok(n) => Arg::Int(n),
                Err(_) => Arg::Text(token.to_string()),
            });
        }
    }
    Some(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn err_of(raw: &str) -> crate::error::FieldErrors {
        parse_query(raw).unwrap_err().field_errors().cloned().unwrap()
    }

    #[test]
    fn full_chain() {
        let spec = parse_query(
            "table('harga as h')->join('menu m','m.id','=','h.menu_id')->select('h.nama','m.menu_name')\
             ->where('h.harga','>=',100)->where('m.menu_name','like','soto')->orderby('h.nama','desc')->take(10)",
        )
        .unwrap();
        assert_eq!(spec.table, "harga");
        assert_eq!(spec.alias, "h");
        assert_eq!(spec.select.iter().map(|c| c.raw.as_str()).collect::<Vec<_>>(), vec!["h.nama", "m.menu_name"]);
        assert_eq!(spec.joins.len(), 1);
        assert_eq!(spec.joins[0].alias, "m");
        assert_eq!(spec.wheres[0].op, Operator::Gte);
        assert_eq!(spec.wheres[0].value, Arg::Int(100));
        assert_eq!(spec.wheres[1].op, Operator::Like);
        assert_eq!(spec.order_by[0].dir, Direction::Desc);
        assert_eq!(spec.limit, Some(10));
        assert_eq!(spec.tables().collect::<Vec<_>>(), vec!["harga", "menu"]);
    }

    #[test]
    fn bare_table_is_its_own_alias() {
        let spec = parse_query("table('m')->where('bad_col','=','1')").unwrap();
        assert_eq!(spec.alias, "m");
        assert_eq!(spec.wheres[0].column.raw, "bad_col");
        assert_eq!(spec.wheres[0].value, Arg::Text("1".into()));
    }

    #[test]
    fn two_argument_where_is_equality() {
        let spec = parse_query("TABLE('menu')->Where('menu_name', 'Soto')").unwrap();
        assert_eq!(spec.wheres[0].op, Operator::Eq);
    }

    #[test]
    fn arrow_inside_literal_is_not_a_split_point() {
        let spec = parse_query("table('menu')->where('menu_name','a->b')").unwrap();
        assert_eq!(spec.wheres[0].value, Arg::Text("a->b".into()));
    }

    #[test]
    fn empty_and_missing_table() {
        assert_eq!(err_of("  ")["query"], "required");
        assert_eq!(err_of("select('a')")["table"], "required");
    }

    #[test]
    fn unsupported_method_names_segment() {
        let e = err_of("table('menu')->delete()");
        assert_eq!(e["query"], "unsupported method at segment 1: delete()");
        let e = err_of("table('menu')->whereRaw('1=1')");
        assert_eq!(e["query"], "unsupported method at segment 1: whereRaw('1=1')");
    }

    #[test]
    fn malformed_segments() {
        assert_eq!(err_of("table('menu')->take")["query"], "invalid segment 1: take");
        assert_eq!(err_of("table('menu)")["query"], "invalid segment 0: table('menu)");
        assert_eq!(err_of("table('menu' x)")["query"], "invalid segment 0: table('menu' x)");
        assert_eq!(err_of("table('menu');drop()")["query"], "invalid segment 0: table('menu');drop()");
    }

    #[test]
    fn argument_rules() {
        assert_eq!(err_of("table('a','b')")["table"], "expects 1 argument");
        assert_eq!(err_of("table('a b c d')")["table"], "invalid");
        assert_eq!(err_of("table('a')->select()")["select"], "empty");
        assert_eq!(err_of("table('a')->select('x.y.z')")["select"], "invalid column");
        assert_eq!(err_of("table('a')->join('b','b.id','<','a.id')")["join"], "only '=' supported");
        assert_eq!(err_of("table('a')->join('b','b.id')")["join"], "expects 4 arguments");
        assert_eq!(err_of("table('a')->where('x','!=','1')")["where"], "unsupported operator");
        assert_eq!(err_of("table('a')->where('x')")["where"], "expects 2 or 3 arguments");
        assert_eq!(err_of("table('a')->orderby('x','up')")["orderby"], "dir must be asc or desc");
        assert_eq!(err_of("table('a')->take(0)")["take"], "invalid");
        assert_eq!(err_of("table('a')->take('ten')")["take"], "invalid");
    }

    #[test]
    fn take_accepts_quoted_number() {
        assert_eq!(parse_query("table('a')->take('5')").unwrap().limit, Some(5));
    }
}
