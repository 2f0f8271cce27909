mod models;
mod schema;

pub use models::{AliasRecord, PerformerAliases, PerformerRecord};
pub use schema::{
    PERFORMERS_TABLE_V1, PERFORMERS_TABLE_V2, PERFORMER_ALIASES_TABLE_V2,
    PERFORMER_VERSIONED_SCHEMAS,
};
