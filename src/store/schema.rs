pub const SCHEMA: &str = r#"
-- Release flags; the name is unique so concurrent creators cannot both win
CREATE TABLE IF NOT EXISTS release_flags (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    rand_seed INTEGER NOT NULL DEFAULT 0,
    percentage INTEGER NOT NULL DEFAULT 0 CHECK (percentage BETWEEN 0 AND 100),
    decision_logic_api TEXT          -- NULL = percentage strategy
);

-- Manual enrollment overrides, at most one per flag and external id
CREATE TABLE IF NOT EXISTS release_pilots (
    id TEXT PRIMARY KEY,
    flag_id TEXT NOT NULL REFERENCES release_flags(id) ON DELETE CASCADE,
    external_id TEXT NOT NULL,
    enrolled INTEGER NOT NULL DEFAULT 0,

    UNIQUE(flag_id, external_id)
);

-- IP allow-list entries per flag
CREATE TABLE IF NOT EXISTS release_allows (
    id TEXT PRIMARY KEY,
    flag_id TEXT NOT NULL REFERENCES release_flags(id) ON DELETE CASCADE,
    ip_addr TEXT NOT NULL
);

-- Tokens are only stored here; issuance lives elsewhere
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    owner_uid TEXT NOT NULL,
    sha512_hex TEXT NOT NULL,
    issued_at TEXT DEFAULT (datetime('now')),
    duration_secs INTEGER NOT NULL DEFAULT 0
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_pilots_external_id ON release_pilots(external_id);
CREATE INDEX IF NOT EXISTS idx_allows_flag ON release_allows(flag_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_sha512_hex ON tokens(sha512_hex);
"#;
