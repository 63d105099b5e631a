pub mod users;

pub use users::{handle_demote_user, handle_get_users, handle_promote_user};
