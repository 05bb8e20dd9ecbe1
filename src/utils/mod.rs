pub mod logging;
pub mod spool;
