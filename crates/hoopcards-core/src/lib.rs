// Library root: the season stats loader, the card generator and the store
// abstraction they share.

pub mod cards;
pub mod classify;
pub mod config;
pub mod draft;
pub mod loader;
pub mod model;
pub mod schema;
pub mod store;
pub mod thresholds;
