pub mod account;

pub use account::{Account, Capability, NewAccount, Role};
