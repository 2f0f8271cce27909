use std::fmt;
use thiserror::Error;

/// Stages of a normalize-then-constrain post-migration, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStage {
    AliasPass,
    DuplicatePass,
    SchemaFinalize,
    Done,
}

impl fmt::Display for MigrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationStage::AliasPass => "alias pass",
            MigrationStage::DuplicatePass => "duplicate pass",
            MigrationStage::SchemaFinalize => "schema finalization",
            MigrationStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("storage error")]
    Storage(#[from] rusqlite::Error),

    #[error("performer {performer_id} ({name:?}) has non-numeric disambiguation {value:?} among same-name rows")]
    InvalidDisambiguation {
        performer_id: i64,
        name: String,
        value: String,
    },

    #[error("page row with key {key} is not strictly after key {after}")]
    CursorOrder { key: i64, after: i64 },

    #[error("failed to create unique index {index}")]
    Finalize {
        index: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{stage} failed")]
    Stage {
        stage: MigrationStage,
        #[source]
        source: Box<MigrationError>,
    },
}

impl MigrationError {
    pub fn in_stage(self, stage: MigrationStage) -> Self {
        MigrationError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The stage the error was raised in, if it was attributed to one.
    pub fn stage(&self) -> Option<MigrationStage> {
        match self {
            MigrationError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The error beneath any stage attribution.
    pub fn root(&self) -> &MigrationError {
        match self {
            MigrationError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}
