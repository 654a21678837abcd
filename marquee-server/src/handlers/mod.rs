pub mod health;
pub mod lists;
pub mod lookup;
