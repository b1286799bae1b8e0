pub mod dist;
pub mod ops;
pub mod rates;
pub mod setup;
pub mod transactions;
pub mod tree;
pub mod ui;
pub mod watch;
