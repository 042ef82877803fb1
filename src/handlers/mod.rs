pub(crate) mod fleet;
pub(crate) mod stats;
pub(crate) mod tickets;
pub(crate) mod users;
pub(crate) mod webhook;
