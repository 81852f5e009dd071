pub mod cache;
pub mod clean;
pub mod inspect;
pub mod reconcile;
pub mod util;
