use mocards_core::ServiceError;
use mocards_sql::SQLStore;

/// DDL for every MOCARDS table.
///
/// Each table stores the full JSON document in `data`, with the columns the
/// service filters on (and the ones that must be unique) pulled out beside it.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS card_batches (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        batch_number TEXT NOT NULL UNIQUE,
        total_cards INTEGER NOT NULL DEFAULT 0,
        cards_assigned INTEGER NOT NULL DEFAULT 0,
        status TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS cards (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        batch_id TEXT NOT NULL,
        clinic_id TEXT,
        control_number TEXT NOT NULL UNIQUE,
        control_number_v2 TEXT UNIQUE,
        passcode TEXT NOT NULL UNIQUE,
        location_code TEXT,
        status TEXT,
        expires_at TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS card_perks (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        card_id TEXT NOT NULL,
        perk_type TEXT NOT NULL,
        claimed INTEGER NOT NULL DEFAULT 0,
        create_at TEXT,
        update_at TEXT,
        UNIQUE(card_id, perk_type)
    )",
    "CREATE TABLE IF NOT EXISTS card_transactions (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        card_id TEXT NOT NULL,
        transaction_type TEXT,
        clinic_id TEXT,
        create_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS clinics (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        clinic_code TEXT NOT NULL UNIQUE,
        clinic_number INTEGER NOT NULL UNIQUE,
        location_code TEXT,
        status TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS location_codes (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        code TEXT NOT NULL UNIQUE,
        region_number INTEGER NOT NULL UNIQUE,
        is_active INTEGER NOT NULL DEFAULT 1,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS appointments (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        clinic_id TEXT NOT NULL,
        status TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS clinic_messages (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        clinic_id TEXT NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS system_config (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS text_labels (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        category TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS code_formats (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        create_at TEXT,
        update_at TEXT
    )",
    // Indexes
    "CREATE INDEX IF NOT EXISTS idx_card_batch ON cards(batch_id)",
    "CREATE INDEX IF NOT EXISTS idx_card_clinic ON cards(clinic_id)",
    "CREATE INDEX IF NOT EXISTS idx_card_status ON cards(status)",
    "CREATE INDEX IF NOT EXISTS idx_card_expiry ON cards(status, expires_at)",
    "CREATE INDEX IF NOT EXISTS idx_perk_card ON card_perks(card_id)",
    "CREATE INDEX IF NOT EXISTS idx_txn_card ON card_transactions(card_id)",
    "CREATE INDEX IF NOT EXISTS idx_batch_status ON card_batches(status)",
    "CREATE INDEX IF NOT EXISTS idx_clinic_status ON clinics(status)",
    "CREATE INDEX IF NOT EXISTS idx_appt_clinic ON appointments(clinic_id)",
    "CREATE INDEX IF NOT EXISTS idx_msg_clinic ON clinic_messages(clinic_id)",
    "CREATE INDEX IF NOT EXISTS idx_label_category ON text_labels(category)",
];

pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    for stmt in SCHEMA {
        sql.exec(stmt, &[])
            .map_err(|e| ServiceError::Storage(format!("schema init failed: {}", e)))?;
    }
    Ok(())
}
