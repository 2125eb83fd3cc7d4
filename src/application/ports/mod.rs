pub mod api_gateway;
pub mod key_value_store;

pub use api_gateway::{AuthPayload, ForumApi, PostPayload, RegisterPayload, ReplyPayload};
pub use key_value_store::KeyValueStore;
