mod server;

pub use server::OrderManagementServiceImpl;
