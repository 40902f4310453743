//! SQL schema for the skillgap SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Skill forest. Deleting a skill deletes its whole subtree.
CREATE TABLE IF NOT EXISTS skills (
    skill_id        TEXT PRIMARY KEY,
    skill_name      TEXT NOT NULL,
    parent_skill_id TEXT REFERENCES skills(skill_id) ON DELETE CASCADE,
    description     TEXT
);

-- At most two layers; enforced by the engine, not here.
CREATE TABLE IF NOT EXISTS competencies (
    competency_id        TEXT PRIMARY KEY,
    competency_name      TEXT NOT NULL,
    name_key             TEXT NOT NULL,   -- trimmed, lowercased name
    description          TEXT,
    parent_competency_id TEXT REFERENCES competencies(competency_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS competency_skills (
    competency_id TEXT NOT NULL REFERENCES competencies(competency_id) ON DELETE CASCADE,
    skill_id      TEXT NOT NULL REFERENCES skills(skill_id) ON DELETE CASCADE,
    PRIMARY KEY (competency_id, skill_id)
);

CREATE TABLE IF NOT EXISTS users (
    user_id         TEXT PRIMARY KEY,
    user_name       TEXT NOT NULL,
    company_id      TEXT NOT NULL,
    employee_type   TEXT,
    path_career     TEXT,
    raw_data        TEXT,
    relevance_score REAL NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_skills (
    user_id     TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    skill_id    TEXT NOT NULL REFERENCES skills(skill_id) ON DELETE CASCADE,
    skill_name  TEXT NOT NULL,
    verified    INTEGER NOT NULL,
    source      TEXT NOT NULL,       -- 'assessment' | 'certification' | 'claim' | 'ai'
    last_update TEXT NOT NULL,
    PRIMARY KEY (user_id, skill_id)
);

-- `version` is bumped on every verified-skill snapshot write.
CREATE TABLE IF NOT EXISTS user_competencies (
    user_id             TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    competency_id       TEXT NOT NULL REFERENCES competencies(competency_id) ON DELETE CASCADE,
    coverage_percentage REAL NOT NULL DEFAULT 0,
    proficiency_level   TEXT,
    version             INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, competency_id)
);

-- The verified-skill snapshot of a user competency, one row per skill.
CREATE TABLE IF NOT EXISTS user_verified_skills (
    user_id       TEXT NOT NULL,
    competency_id TEXT NOT NULL,
    skill_id      TEXT NOT NULL REFERENCES skills(skill_id) ON DELETE CASCADE,
    skill_name    TEXT NOT NULL,
    verified      INTEGER NOT NULL,
    last_update   TEXT NOT NULL,
    PRIMARY KEY (user_id, competency_id, skill_id),
    FOREIGN KEY (user_id, competency_id)
        REFERENCES user_competencies(user_id, competency_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS skills_parent_idx            ON skills(parent_skill_id);
CREATE INDEX IF NOT EXISTS competencies_parent_idx      ON competencies(parent_competency_id);
CREATE INDEX IF NOT EXISTS competencies_name_idx        ON competencies(name_key);
CREATE INDEX IF NOT EXISTS competency_skills_skill_idx  ON competency_skills(skill_id);
CREATE INDEX IF NOT EXISTS user_verified_skills_skill_idx ON user_verified_skills(skill_id);

PRAGMA user_version = 1;
";
