pub mod messages;
pub mod service;

pub use messages::Messages;
pub use service::{ActiveUser, AuthenticatedUser, ChatService};
