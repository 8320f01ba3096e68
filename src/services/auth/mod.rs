pub mod claims;
pub mod error;
pub mod factory;
pub mod keys;
pub mod login;
pub mod options;
pub mod principal;
pub mod router;
pub mod session_issuer;
pub mod session_validator;
pub mod token_issuer;
pub mod token_validator;

pub use claims::{Claim, ClaimsBuilder, claim_types};
pub use error::{AuthError, AuthResult};
pub use factory::build_auth_services;
pub use login::LoginService;
pub use principal::{Principal, Scheme};
pub use router::{
    AuthRequirement, AuthState, Authentication, AuthenticationRouter, Challenge,
    SchemeRequirement,
};
pub use session_issuer::{SessionCookie, SessionIssuer, clear_cookie};
pub use session_validator::{SessionValidation, SessionValidator};
pub use token_issuer::{IssuedToken, TokenIssuer};
pub use token_validator::TokenValidator;
