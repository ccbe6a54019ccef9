//! Relational schema. SQLite keeps this a single coherent store rather
//! than a pluggable rocksdb/postgres/mysql/s3/azure/elastic/redis
//! backend matrix (see DESIGN.md).

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    usernum             INTEGER PRIMARY KEY,
    username            TEXT NOT NULL UNIQUE,
    verification_token  BLOB NOT NULL,
    salt                BLOB NOT NULL,
    private_key_blob     BLOB NOT NULL,
    public_key           BLOB NOT NULL,
    flags                INTEGER NOT NULL DEFAULT 0,
    last_activity        INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS folders (
    foldernum   INTEGER PRIMARY KEY,
    usernum     INTEGER NOT NULL REFERENCES users(usernum),
    parent      INTEGER NOT NULL DEFAULT 0,
    name        TEXT NOT NULL,
    sort_order  INTEGER NOT NULL DEFAULT 0,
    UNIQUE(usernum, parent, name)
);

CREATE TABLE IF NOT EXISTS aliases (
    aliasnum     INTEGER PRIMARY KEY,
    usernum      INTEGER NOT NULL REFERENCES users(usernum),
    display_name TEXT NOT NULL,
    address      TEXT NOT NULL,
    selected     INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS messages (
    messagenum  INTEGER NOT NULL,
    usernum     INTEGER NOT NULL REFERENCES users(usernum),
    foldernum   INTEGER NOT NULL,
    onum        INTEGER NOT NULL,
    tnum        INTEGER NOT NULL,
    size        INTEGER NOT NULL,
    server      TEXT NOT NULL,
    status      INTEGER NOT NULL DEFAULT 0,
    signum      INTEGER NOT NULL DEFAULT 0,
    sigkey      TEXT NOT NULL DEFAULT '',
    tags        TEXT NOT NULL DEFAULT '',
    created     INTEGER NOT NULL,
    PRIMARY KEY (usernum, messagenum)
);

CREATE INDEX IF NOT EXISTS messages_by_folder ON messages(usernum, foldernum);

CREATE TABLE IF NOT EXISTS objects (
    onum     INTEGER PRIMARY KEY,
    host     TEXT NOT NULL,
    tnum     INTEGER NOT NULL,
    unum     INTEGER NOT NULL,
    created  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS journal (
    onum     INTEGER NOT NULL,
    host     TEXT NOT NULL,
    tnum     INTEGER NOT NULL,
    unum     INTEGER NOT NULL,
    created  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS inbound_prefs (
    usernum        INTEGER PRIMARY KEY REFERENCES users(usernum),
    quota_bytes     INTEGER NOT NULL DEFAULT 0,
    used_bytes      INTEGER NOT NULL DEFAULT 0,
    daily_limit     INTEGER NOT NULL DEFAULT 0,
    spam_enabled    INTEGER NOT NULL DEFAULT 1,
    virus_enabled   INTEGER NOT NULL DEFAULT 1,
    spf_enabled     INTEGER NOT NULL DEFAULT 1,
    dkim_enabled    INTEGER NOT NULL DEFAULT 1,
    rbl_enabled     INTEGER NOT NULL DEFAULT 1,
    greylist_enabled INTEGER NOT NULL DEFAULT 1,
    forward_address TEXT NOT NULL DEFAULT '',
    autoreply_id    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS filters (
    filternum   INTEGER PRIMARY KEY,
    usernum     INTEGER NOT NULL REFERENCES users(usernum),
    position    INTEGER NOT NULL,
    location    TEXT NOT NULL,
    match_type  TEXT NOT NULL,
    pattern     TEXT NOT NULL,
    action      TEXT NOT NULL,
    action_arg  TEXT NOT NULL DEFAULT ''
);
"#;

pub fn initialize(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
