pub mod config;
pub mod urlprefix;
pub mod timefmt;
pub mod columns;
pub mod models;
pub mod error;
pub mod client;
pub mod commands;
pub mod notify;
pub mod tasks_table;
pub mod workers_table;
