//! Merit-order dashboard: generator registry + fuel prices → merit-order
//! curve, generator map and capacity table, served as a single-session web page.

pub mod colors;
pub mod config;
pub mod data;
pub mod logging;
pub mod merit;
pub mod page;
pub mod prices;
pub mod server;
pub mod session;
pub mod views;
