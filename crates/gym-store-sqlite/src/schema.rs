//! SQL schema for the gym SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS people (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name  TEXT NOT NULL,
    phone      TEXT NOT NULL,
    UNIQUE (full_name, phone)
);

CREATE TABLE IF NOT EXISTS plans (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    title          TEXT    NOT NULL,
    price          REAL    NOT NULL,
    duration_days  INTEGER NOT NULL,
    freeze_days    INTEGER NOT NULL DEFAULT 0
);

-- Dates are ISO 8601 calendar dates (YYYY-MM-DD).
-- Only `status` is ever updated in place.
CREATE TABLE IF NOT EXISTS person_subscriptions (
    number      TEXT PRIMARY KEY,
    person_id   INTEGER NOT NULL REFERENCES people(id),
    plan_id     INTEGER NOT NULL REFERENCES plans(id),
    start_date  TEXT NOT NULL,
    end_date    TEXT NOT NULL,
    status      TEXT NOT NULL    -- 'frozen' | 'active' | 'expired'
);

CREATE INDEX IF NOT EXISTS person_subscriptions_person_idx
    ON person_subscriptions(person_id);
CREATE INDEX IF NOT EXISTS people_full_name_idx ON people(full_name);

PRAGMA user_version = 1;
";
