pub mod password;
pub mod purpose;
pub mod scope;
pub mod token;

pub use password::{Argon2Params, CredentialStore, PasswordError};
pub use purpose::{InvalidToken, PurposeTokenService};
