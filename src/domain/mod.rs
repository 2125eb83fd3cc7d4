pub mod entities;

pub use entities::{Category, Post, PostDraft, Reply, Session, User};
