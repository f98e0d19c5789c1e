pub mod app;
pub mod catalog;
pub mod config;
pub mod cycle;
pub mod domain;
pub mod error;
pub mod index;
pub mod output;
pub mod store;
pub mod transport;
