//! The relational index: prepared-statement-shaped CRUD over the schema
//! in `schema.rs`, pooled with r2d2 so SMTP/IMAP/POP sessions can share a
//! small number of SQLite connections without serializing on a single
//! `Mutex<Connection>`.

use std::path::Path;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use crate::error::StoreError;
use crate::meta::{Alias, Folder, MetaMessage, MAX_FOLDER_DEPTH};
use crate::schema;

pub type Pool = r2d2::Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct Index {
    pool: Pool,
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub usernum: u64,
    pub username: String,
    pub verification_token: Vec<u8>,
    pub salt: Vec<u8>,
    pub private_key_blob: Vec<u8>,
    pub public_key: Vec<u8>,
    pub flags: u32,
    pub last_activity: i64,
}

impl Index {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = r2d2::Pool::builder().max_size(8).build(manager)?;
        schema::initialize(&pool.get()?)?;
        Ok(Index { pool })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder().max_size(8).build(manager)?;
        schema::initialize(&pool.get()?)?;
        Ok(Index { pool })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    // --- users ---

    pub fn insert_user(&self, user: &UserRecord) -> Result<u64, StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO users (username, verification_token, salt, private_key_blob, public_key, flags, last_activity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.username,
                user.verification_token,
                user.salt,
                user.private_key_blob,
                user.public_key,
                user.flags,
                user.last_activity,
            ],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT usernum, username, verification_token, salt, private_key_blob, public_key, flags, last_activity
             FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn user_by_usernum(&self, usernum: u64) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT usernum, username, verification_token, salt, private_key_blob, public_key, flags, last_activity
             FROM users WHERE usernum = ?1",
            params![usernum],
            row_to_user,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn touch_user_activity(&self, usernum: u64, now: i64) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users SET last_activity = ?1 WHERE usernum = ?2",
            params![now, usernum],
        )?;
        Ok(())
    }

    // --- folders ---

    pub fn folder_list(&self, usernum: u64) -> Result<Vec<Folder>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT foldernum, usernum, parent, name, sort_order FROM folders
             WHERE usernum = ?1 ORDER BY parent, sort_order",
        )?;
        let rows = stmt
            .query_map(params![usernum], row_to_folder)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn folder_depth(&self, usernum: u64, parent: u64) -> Result<u32, StoreError> {
        let mut depth = 0u32;
        let mut current = parent;
        let folders = self.folder_list(usernum)?;
        while current != 0 {
            depth += 1;
            if depth > MAX_FOLDER_DEPTH {
                break;
            }
            current = folders
                .iter()
                .find(|f| f.foldernum == current)
                .map(|f| f.parent)
                .unwrap_or(0);
        }
        Ok(depth)
    }

    pub fn folder_create(
        &self,
        usernum: u64,
        parent: u64,
        name: &str,
        sort_order: i64,
    ) -> Result<u64, StoreError> {
        if self.folder_depth(usernum, parent)? >= MAX_FOLDER_DEPTH {
            return Err(StoreError::Corrupt {
                onum: 0,
                reason: "folder depth exceeds maximum",
            });
        }
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO folders (usernum, parent, name, sort_order) VALUES (?1, ?2, ?3, ?4)",
            params![usernum, parent, name, sort_order],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    pub fn folder_rename(&self, usernum: u64, foldernum: u64, name: &str) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE folders SET name = ?1 WHERE usernum = ?2 AND foldernum = ?3",
            params![name, usernum, foldernum],
        )?;
        Ok(())
    }

    /// Cascades: removes descendant folders and all contained messages,
    /// folder-delete invariant.
    pub fn folder_delete(&self, usernum: u64, foldernum: u64) -> Result<(), StoreError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let mut to_delete = vec![foldernum];
        let mut frontier = vec![foldernum];
        while let Some(current) = frontier.pop() {
            let mut stmt = tx.prepare("SELECT foldernum FROM folders WHERE usernum = ?1 AND parent = ?2")?;
            let children: Vec<u64> = stmt
                .query_map(params![usernum, current], |row| row.get::<_, i64>(0).map(|v| v as u64))?
                .collect::<Result<_, _>>()?;
            for child in children {
                to_delete.push(child);
                frontier.push(child);
            }
        }
        for folder in &to_delete {
            tx.execute(
                "DELETE FROM messages WHERE usernum = ?1 AND foldernum = ?2",
                params![usernum, folder],
            )?;
            tx.execute(
                "DELETE FROM folders WHERE usernum = ?1 AND foldernum = ?2",
                params![usernum, folder],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // --- aliases ---

    pub fn alias_list(&self, usernum: u64) -> Result<Vec<Alias>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT aliasnum, usernum, display_name, address, selected FROM aliases WHERE usernum = ?1",
        )?;
        let rows = stmt
            .query_map(params![usernum], |row| {
                Ok(Alias {
                    aliasnum: row.get::<_, i64>(0)? as u64,
                    usernum: row.get::<_, i64>(1)? as u64,
                    display_name: row.get(2)?,
                    address: row.get(3)?,
                    selected: row.get::<_, i64>(4)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn alias_create(
        &self,
        usernum: u64,
        display_name: &str,
        address: &str,
        selected: bool,
    ) -> Result<u64, StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO aliases (usernum, display_name, address, selected) VALUES (?1, ?2, ?3, ?4)",
            params![usernum, display_name, address, selected as i64],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    // --- messages ---

    pub fn message_list_by_folder(
        &self,
        usernum: u64,
        foldernum: u64,
    ) -> Result<Vec<MetaMessage>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT messagenum, usernum, foldernum, onum, tnum, size, server, status, signum, sigkey, tags, created
             FROM messages WHERE usernum = ?1 AND foldernum = ?2 AND (status & ?3) = 0
             ORDER BY messagenum",
        )?;
        let rows = stmt
            .query_map(
                params![usernum, foldernum, crate::meta::STATUS_HIDDEN],
                row_to_message,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn message_by_num(&self, usernum: u64, messagenum: u64) -> Result<Option<MetaMessage>, StoreError> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT messagenum, usernum, foldernum, onum, tnum, size, server, status, signum, sigkey, tags, created
             FROM messages WHERE usernum = ?1 AND messagenum = ?2",
            params![usernum, messagenum],
            row_to_message,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Allocates the next `messagenum` for the user and inserts the meta
    /// row. Intended to run inside the caller's storage-engine transaction.
    pub fn message_insert(
        &self,
        conn: &rusqlite::Connection,
        msg: &MetaMessage,
    ) -> Result<u64, StoreError> {
        let next: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(messagenum), 0) + 1 FROM messages WHERE usernum = ?1",
                params![msg.usernum],
                |row| row.get(0),
            )
            .unwrap_or(1);
        conn.execute(
            "INSERT INTO messages (messagenum, usernum, foldernum, onum, tnum, size, server, status, signum, sigkey, tags, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                next,
                msg.usernum,
                msg.foldernum,
                msg.onum,
                msg.tnum,
                msg.size,
                msg.server,
                msg.status,
                msg.signum,
                msg.sigkey,
                msg.tags.join(","),
                msg.created,
            ],
        )?;
        Ok(next as u64)
    }

    /// Marks a message hidden without deleting its index row; it
    /// remains in the index until explicit expunge.
    pub fn message_hide(&self, usernum: u64, messagenum: u64) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE messages SET status = status | ?1 WHERE usernum = ?2 AND messagenum = ?3",
            params![crate::meta::STATUS_HIDDEN, usernum, messagenum],
        )?;
        Ok(())
    }

    pub fn message_update_status(
        &self,
        usernum: u64,
        messagenum: u64,
        status: u32,
    ) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE messages SET status = ?1 WHERE usernum = ?2 AND messagenum = ?3",
            params![status, usernum, messagenum],
        )?;
        Ok(())
    }

    /// Permanently removes a DELETED message's meta row (IMAP EXPUNGE,
    /// POP QUIT-commit).
    pub fn message_expunge(&self, usernum: u64, messagenum: u64) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM messages WHERE usernum = ?1 AND messagenum = ?2",
            params![usernum, messagenum],
        )?;
        Ok(())
    }

    pub fn message_copy(
        &self,
        usernum: u64,
        messagenum: u64,
        destination_folder: u64,
    ) -> Result<u64, StoreError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let original = tx
            .query_row(
                "SELECT messagenum, usernum, foldernum, onum, tnum, size, server, status, signum, sigkey, tags, created
                 FROM messages WHERE usernum = ?1 AND messagenum = ?2",
                params![usernum, messagenum],
                row_to_message,
            )
            .optional()?
            .ok_or(StoreError::NotFound { onum: 0 })?;
        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(messagenum), 0) + 1 FROM messages WHERE usernum = ?1",
            params![usernum],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO messages (messagenum, usernum, foldernum, onum, tnum, size, server, status, signum, sigkey, tags, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                next,
                usernum,
                destination_folder,
                original.onum,
                original.tnum,
                original.size,
                original.server,
                original.status,
                original.signum,
                original.sigkey,
                original.tags.join(","),
                original.created,
            ],
        )?;
        tx.commit()?;
        Ok(next as u64)
    }

    // --- storage objects / journal ---

    pub fn object_insert(
        &self,
        conn: &rusqlite::Connection,
        host: &str,
        tnum: u64,
        unum: u64,
        created: i64,
    ) -> Result<u64, StoreError> {
        conn.execute(
            "INSERT INTO objects (host, tnum, unum, created) VALUES (?1, ?2, ?3, ?4)",
            params![host, tnum, unum, created],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    pub fn object_delete(&self, onum: u64) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM objects WHERE onum = ?1", params![onum])?;
        Ok(())
    }

    pub fn journal_insert(
        &self,
        onum: u64,
        host: &str,
        tnum: u64,
        unum: u64,
        created: i64,
    ) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO journal (onum, host, tnum, unum, created) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![onum, host, tnum, unum, created],
        )?;
        Ok(())
    }

    pub fn transaction_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        usernum: row.get::<_, i64>(0)? as u64,
        username: row.get(1)?,
        verification_token: row.get(2)?,
        salt: row.get(3)?,
        private_key_blob: row.get(4)?,
        public_key: row.get(5)?,
        flags: row.get::<_, i64>(6)? as u32,
        last_activity: row.get(7)?,
    })
}

fn row_to_folder(row: &rusqlite::Row) -> rusqlite::Result<Folder> {
    Ok(Folder {
        foldernum: row.get::<_, i64>(0)? as u64,
        usernum: row.get::<_, i64>(1)? as u64,
        parent: row.get::<_, i64>(2)? as u64,
        name: row.get(3)?,
        sort_order: row.get(4)?,
    })
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<MetaMessage> {
    let tags: String = row.get(10)?;
    Ok(MetaMessage {
        messagenum: row.get::<_, i64>(0)? as u64,
        usernum: row.get::<_, i64>(1)? as u64,
        foldernum: row.get::<_, i64>(2)? as u64,
        onum: row.get::<_, i64>(3)? as u64,
        tnum: row.get::<_, i64>(4)? as u64,
        size: row.get::<_, i64>(5)? as u64,
        server: row.get(6)?,
        status: row.get::<_, i64>(7)? as u32,
        signum: row.get::<_, i64>(8)? as u64,
        sigkey: row.get(9)?,
        tags: if tags.is_empty() {
            Vec::new()
        } else {
            tags.split(',').map(String::from).collect()
        },
        created: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(name: &str) -> UserRecord {
        UserRecord {
            usernum: 0,
            username: name.to_string(),
            verification_token: vec![1, 2, 3],
            salt: vec![0u8; 128],
            private_key_blob: vec![4, 5, 6],
            public_key: vec![7, 8, 9],
            flags: 0,
            last_activity: 0,
        }
    }

    #[test]
    fn inserts_and_looks_up_user_by_username() {
        let index = Index::open_in_memory().unwrap();
        let usernum = index.insert_user(&sample_user("alice@example.com")).unwrap();
        let found = index.user_by_username("alice@example.com").unwrap().unwrap();
        assert_eq!(found.usernum, usernum);
    }

    #[test]
    fn folder_delete_cascades_to_children_and_messages() {
        let index = Index::open_in_memory().unwrap();
        let usernum = index.insert_user(&sample_user("bob@example.com")).unwrap();
        let inbox = index.folder_create(usernum, 0, "INBOX", 0).unwrap();
        let child = index.folder_create(usernum, inbox, "Archive", 1).unwrap();

        let msg = MetaMessage {
            messagenum: 0,
            usernum,
            foldernum: child,
            onum: 1,
            tnum: 0,
            size: 10,
            server: "s1".into(),
            status: 0,
            signum: 0,
            sigkey: String::new(),
            tags: vec![],
            created: 0,
        };
        let conn = index.pool().get().unwrap();
        index.message_insert(&conn, &msg).unwrap();
        drop(conn);

        index.folder_delete(usernum, inbox).unwrap();
        assert!(index.folder_list(usernum).unwrap().is_empty());
        assert!(index.message_list_by_folder(usernum, child).unwrap().is_empty());
    }

    #[test]
    fn message_hide_keeps_row_but_marks_status() {
        let index = Index::open_in_memory().unwrap();
        let usernum = index.insert_user(&sample_user("carol@example.com")).unwrap();
        let folder = index.folder_create(usernum, 0, "INBOX", 0).unwrap();
        let msg = MetaMessage {
            messagenum: 0,
            usernum,
            foldernum: folder,
            onum: 1,
            tnum: 0,
            size: 1,
            server: "s".into(),
            status: 0,
            signum: 0,
            sigkey: String::new(),
            tags: vec![],
            created: 0,
        };
        let conn = index.pool().get().unwrap();
        let messagenum = index.message_insert(&conn, &msg).unwrap();
        drop(conn);

        index.message_hide(usernum, messagenum).unwrap();
        assert!(index.message_list_by_folder(usernum, folder).unwrap().is_empty());
        let still_present = index.message_by_num(usernum, messagenum).unwrap().unwrap();
        assert!(still_present.is_hidden());
    }
}
