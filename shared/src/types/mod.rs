pub mod claims;
pub mod identity;
pub mod json_error;
pub mod login;
pub mod post;
pub mod register;
pub mod server_config;

pub use self::claims::SessionClaims;
pub use self::identity::{Identity, Role, is_privileged};
pub use self::json_error::ErrorResponse;
pub use self::login::{LoginData, LoginError, LoginResponse};
pub use self::post::{
    NewPostData, Pagination, Post, PostError, PostListResponse, PostResponse,
};
pub use self::register::{RegistrationData, RegistrationError, RegistrationResponse};
