//! HTTP handlers for table CRUD and query expressions.

pub mod crud;
pub mod query;
