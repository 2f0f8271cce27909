mod versioned_schema;

pub use versioned_schema::{
    Column, ForeignKey, PartialUniqueIndex, SqlType, Table, VersionedSchema,
    BASE_DB_VERSION,
};
