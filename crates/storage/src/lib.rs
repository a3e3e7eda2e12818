#![forbid(unsafe_code)]

pub mod corpus;
pub mod repository;
pub mod sqlite;
