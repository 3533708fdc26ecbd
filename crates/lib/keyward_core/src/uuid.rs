// Refresh-session rows are generated app-side as UUIDv7 so that listing a
// user's sessions by id follows issuance order. Users keep PG's
// gen_random_uuid() (v4).

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
