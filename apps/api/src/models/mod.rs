pub mod delivery;
pub mod profile;
pub mod recipient;
pub mod reminder;
