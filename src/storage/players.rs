//! Player registry

use super::{player_stats, Storage, StorageError};
use crate::model::{Player, PlayerId};
use rusqlite::{params, Connection, OptionalExtension};

impl Storage {
    /// Register a new player. Fails if the name is blank or taken.
    pub fn add_player(&self, name: &str) -> Result<Player, StorageError> {
        let name = normalize_name(name)?;
        let tx = self.conn.unchecked_transaction()?;

        if find_by_name(&tx, name)?.is_some() {
            return Err(StorageError::DuplicatePlayer(name.to_string()));
        }
        let player = insert(&tx, name)?;
        tx.commit()?;

        log::info!("added player {} ({})", player.name, player.id);
        Ok(player)
    }

    /// Look a player up by name, creating them if they do not exist yet.
    pub fn get_or_create_player(&self, name: &str) -> Result<Player, StorageError> {
        let name = normalize_name(name)?;
        let tx = self.conn.unchecked_transaction()?;

        if let Some(player) = find_by_name(&tx, name)? {
            return Ok(player);
        }
        let player = insert(&tx, name)?;
        tx.commit()?;

        log::info!("added player {} ({})", player.name, player.id);
        Ok(player)
    }

    /// Every registered player, sorted by name.
    pub fn all_players(&self) -> Result<Vec<Player>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM players ORDER BY name COLLATE NOCASE, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Player {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut players = Vec::new();
        for row in rows {
            players.push(row?);
        }
        Ok(players)
    }

    pub fn player_by_id(&self, id: PlayerId) -> Result<Option<Player>, StorageError> {
        find_by_id(&self.conn, id)
    }

    pub fn player_by_name(&self, name: &str) -> Result<Option<Player>, StorageError> {
        find_by_name(&self.conn, name.trim())
    }
}

fn normalize_name(name: &str) -> Result<&str, StorageError> {
    let name = name.trim();
    if name.is_empty() {
        Err(StorageError::InvalidPlayerName)
    } else {
        Ok(name)
    }
}

fn insert(conn: &Connection, name: &str) -> Result<Player, StorageError> {
    conn.execute("INSERT INTO players (name) VALUES (?1)", params![name])?;
    let player = Player {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    };
    player_stats::ensure_row(conn, player.id)?;
    Ok(player)
}

pub(super) fn find_by_id(conn: &Connection, id: PlayerId) -> Result<Option<Player>, StorageError> {
    let player = conn
        .query_row(
            "SELECT id, name FROM players WHERE id = ?1",
            params![id],
            |row| {
                Ok(Player {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(player)
}

/// Fetch a player that must exist.
pub(super) fn require(conn: &Connection, id: PlayerId) -> Result<Player, StorageError> {
    find_by_id(conn, id)?.ok_or(StorageError::PlayerNotFound(id))
}

fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Player>, StorageError> {
    let player = conn
        .query_row(
            "SELECT id, name FROM players WHERE name = ?1",
            params![name],
            |row| {
                Ok(Player {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(player)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_rows(storage: &Storage) -> i64 {
        storage
            .conn
            .query_row("SELECT COUNT(*) FROM player_stats", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_add_player() {
        let storage = Storage::open_in_memory().unwrap();
        let ali = storage.add_player("  Ali ").unwrap();
        assert_eq!(ali.name, "Ali");
        assert_eq!(storage.player_by_id(ali.id).unwrap(), Some(ali.clone()));
        assert_eq!(storage.player_by_name("Ali").unwrap(), Some(ali));
        assert_eq!(stats_rows(&storage), 1);
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let storage = Storage::open_in_memory().unwrap();
        storage.add_player("Ali").unwrap();

        match storage.add_player("Ali") {
            Err(StorageError::DuplicatePlayer(name)) => assert_eq!(name, "Ali"),
            other => panic!("expected DuplicatePlayer, got {:?}", other),
        }
        assert_eq!(storage.all_players().unwrap().len(), 1);
        assert_eq!(stats_rows(&storage), 1);
    }

    #[test]
    fn test_blank_name_rejected() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(matches!(
            storage.add_player("   "),
            Err(StorageError::InvalidPlayerName)
        ));
        assert!(matches!(
            storage.get_or_create_player(""),
            Err(StorageError::InvalidPlayerName)
        ));
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let storage = Storage::open_in_memory().unwrap();
        let first = storage.get_or_create_player("Veli").unwrap();
        let second = storage.get_or_create_player("Veli").unwrap();
        assert_eq!(first, second);
        assert_eq!(storage.all_players().unwrap().len(), 1);
    }

    #[test]
    fn test_all_players_sorted_by_name() {
        let storage = Storage::open_in_memory().unwrap();
        storage.add_player("veli").unwrap();
        storage.add_player("Ali").unwrap();
        storage.add_player("Cem").unwrap();

        let names: Vec<String> = storage
            .all_players()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Ali", "Cem", "veli"]);
    }

    #[test]
    fn test_missing_player_lookup() {
        let storage = Storage::open_in_memory().unwrap();
        assert_eq!(storage.player_by_id(42).unwrap(), None);
        assert!(matches!(
            require(&storage.conn, 42),
            Err(StorageError::PlayerNotFound(42))
        ));
    }
}
