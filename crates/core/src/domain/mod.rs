pub mod conversation;
pub mod response;
pub mod ticket;
