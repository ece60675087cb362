//! `event_type` → topic routing (§4.6 step 2).

const TABLE: &[(&str, &str)] = &[
    ("link.created", "link-events"),
    ("link.updated", "link-events"),
    ("link.deleted", "link-events"),
    ("link.expired", "link-events"),
];

pub const DEFAULT_TOPIC: &str = "link-events";

pub fn topic_for(event_type: &str) -> &'static str {
    TABLE
        .iter()
        .find(|(et, _)| *et == event_type)
        .map(|(_, topic)| *topic)
        .unwrap_or(DEFAULT_TOPIC)
}
