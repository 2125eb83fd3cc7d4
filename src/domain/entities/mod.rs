pub mod category;
pub mod post;
pub mod reply;
pub mod session;
pub mod user;

pub use category::Category;
pub use post::{Post, PostDraft};
pub use reply::Reply;
pub use session::Session;
pub use user::User;
