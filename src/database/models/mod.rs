pub mod comment;
pub mod note;
pub mod tag;
pub mod token;
pub mod user;

pub use comment::Comment;
pub use note::Note;
pub use tag::Tag;
pub use token::Token;
pub use user::User;
