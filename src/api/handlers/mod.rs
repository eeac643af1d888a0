//! HTTP request handlers organized by resource type

pub mod auth;
pub mod courses;
pub mod health;
pub mod users;

pub use auth::{logout_handler, refresh_handler, signin_handler, signup_handler};
pub use courses::{enroll_handler, get_enrollment_handler};
pub use health::health_handler;
pub use users::{
    delete_user_handler, get_me_handler, get_user_handler, get_user_role_handler,
    list_users_handler, update_me_handler, update_user_handler,
};
