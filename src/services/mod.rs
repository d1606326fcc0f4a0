pub mod notes;
pub mod tokens;
pub mod users;

pub use notes::{NewNote, NoteService, NoteUpdate};
pub use tokens::{access_lifetime, refresh_lifetime, TokenService};
pub use users::{ProfileUpdate, RegisterUser, UserService};
