pub mod nse;
pub mod session;
pub mod yahoo;
