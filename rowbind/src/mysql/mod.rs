//! MySQL executor backend

mod pool;
mod types;

pub use pool::{MySqlPool, DRIVER_NAME};
pub use types::{from_mysql_value, to_mysql_params, to_mysql_value};
