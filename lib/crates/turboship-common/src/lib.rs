pub mod naming;
pub mod types;

pub use naming::{db_name, db_user, identity_user, temp_domain};
pub use types::*;
