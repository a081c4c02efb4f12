mod json_user_store;
mod user_set;

pub use json_user_store::{JsonUserStore, PersistenceError, BACKUP_SUFFIX, TEMP_SUFFIX};
pub use user_set::UserSet;
