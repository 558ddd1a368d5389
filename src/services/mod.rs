pub mod auth;
pub mod chat;
pub mod events;
pub mod profile;
pub mod rsvp;
pub mod teammates;

pub use auth::{AuthService, university_from_email, validate_university_email};
pub use chat::ChatRoom;
pub use events::EventFeed;
pub use profile::{ProfileService, ProfileUpdate};
pub use rsvp::RsvpCoordinator;
pub use teammates::TeammateBoard;
