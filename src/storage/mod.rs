//! Bounded in-memory storage of events and readings

pub mod db;
pub mod matched;
pub mod row;
pub mod table;

pub use db::Db;
pub use row::{Column, ColumnValue, Row, Serial};
