mod participant_store;
mod presence_service;

pub use participant_store::*;
pub use presence_service::*;
