mod client;
mod phone;

pub use client::{Client, ClientDraft, ClientFilter, ClientUpdate};
pub use phone::Phone;
