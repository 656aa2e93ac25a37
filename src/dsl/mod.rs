//! Restricted query expressions: a bounded `method(args)->method(args)` chain.

mod parser;
mod spec;

pub use parser::parse_query;
pub use spec::{Arg, ColumnRef, Direction, JoinSpec, Operator, OrderSpec, QuerySpec, WhereSpec};
