use rusqlite::Row;

use crate::migration::Keyed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformerRecord {
    pub id: i64,
    pub name: String,
    pub disambiguation: Option<String>,
}

impl PerformerRecord {
    /// Maps a `SELECT id, name, disambiguation` row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            disambiguation: row.get(2)?,
        })
    }
}

impl Keyed for PerformerRecord {
    fn key(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRecord {
    pub performer_id: i64,
    pub alias: String,
}

impl AliasRecord {
    /// Maps a `SELECT performer_id, alias` row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            performer_id: row.get(0)?,
            alias: row.get(1)?,
        })
    }
}

/// Every alias row of one performer, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformerAliases {
    pub performer_id: i64,
    pub aliases: Vec<String>,
}

impl PerformerAliases {
    /// Groups records sorted by performer id into one entry per performer.
    pub fn group(records: Vec<AliasRecord>) -> Vec<PerformerAliases> {
        let mut grouped: Vec<PerformerAliases> = Vec::new();
        for record in records {
            match grouped.last_mut() {
                Some(current) if current.performer_id == record.performer_id => {
                    current.aliases.push(record.alias)
                }
                _ => grouped.push(PerformerAliases {
                    performer_id: record.performer_id,
                    aliases: vec![record.alias],
                }),
            }
        }
        grouped
    }
}

impl Keyed for PerformerAliases {
    fn key(&self) -> i64 {
        self.performer_id
    }
}
