pub mod fleet_simulator;
pub mod notifier;
pub mod qr_service;
pub mod razorpay_service;
pub mod receipt;
pub mod signature;
pub mod ticket_workflow;
