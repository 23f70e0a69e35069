pub mod inspection;
pub mod inventory;
pub mod logistics;
pub mod procurement;
pub mod requests;
pub mod reservations;
pub mod sourcing;
