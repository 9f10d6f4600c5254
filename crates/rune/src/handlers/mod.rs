//! HTTP request handlers.

mod api;
mod health;

pub use api::{
    get_config, get_stats, toggle_autoemoji, toggle_autoresponder, update_config, update_status,
};
pub use health::{livez, preflight};
