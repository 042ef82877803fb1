pub mod fleet_dtos;
pub mod ticket_dtos;
pub mod user_dtos;
