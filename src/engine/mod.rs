pub mod badges;
pub mod expiry;
pub mod odds;
pub mod settlement;
pub mod stats;
