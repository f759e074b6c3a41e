pub mod account_service;
pub mod account_service_impl;
pub mod lockout;
pub mod mailer;
pub mod token;

pub use account_service::{AccountService, AuthError};
pub use account_service_impl::SeaOrmAccountService;
pub use lockout::LockoutPolicy;
pub use mailer::{LogMailer, Mailer};
pub use token::TokenIssuer;
