pub mod credentials;
pub mod gateway;
pub mod password;
pub mod sessions;
pub mod token;

pub use credentials::Credentials;
pub use gateway::AuthGateway;
pub use sessions::SessionManager;
