pub mod bus;
pub mod bus_stop;
pub mod ticket;
pub mod transaction;
pub mod user;
