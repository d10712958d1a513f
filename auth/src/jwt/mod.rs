pub mod claims;
pub mod codec;
pub mod errors;

pub use claims::Claims;
pub use codec::TokenCodec;
pub use codec::MAX_TOKEN_LIFETIME_HOURS;
pub use errors::JwtError;
