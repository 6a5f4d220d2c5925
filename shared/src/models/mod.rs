//! Domain models for the Butcher Shop Ledger

mod activity;
mod carcass;
mod product;
mod sale;
mod shift;
mod user;

pub use activity::*;
pub use carcass::*;
pub use product::*;
pub use sale::*;
pub use shift::*;
pub use user::*;
