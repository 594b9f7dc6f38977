pub mod api;
pub mod envelope;
pub mod params;
pub mod server;

pub use envelope::ApiResponse;
pub use params::{AdminForm, AdminParams};
pub use server::{router, start_dashboard_server};
