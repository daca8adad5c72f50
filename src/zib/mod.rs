pub mod audit;
pub mod book;
pub mod config;
pub mod content_store;
pub mod index;
pub mod lock;
pub mod markdown;
pub mod model;
pub mod naming;
pub mod paths;
pub mod reconcile;
pub mod render;
pub mod store;
pub mod util;
pub mod warn;
