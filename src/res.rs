use serde::Deserialize;
use time::OffsetDateTime;

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// One of the predefined study rooms created by `populate-rooms`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRoom {
    pub name: String,
    pub category: String,
    pub recent_message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active: OffsetDateTime,
}

impl std::fmt::Display for SeedRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "seed room {:?}", self.name)
    }
}

pub fn seed_rooms() -> serde_json::Result<Vec<SeedRoom>> {
    serde_json::from_str(include_res!(str, "/seed_rooms.json"))
}
