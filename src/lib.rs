pub mod api;
pub mod catalog;
pub mod config;
pub mod geo;
pub mod models;
pub mod storage;
pub mod store;
pub mod widget;
