pub mod policy;

pub use policy::{validate_sql, SqlPolicyError};
