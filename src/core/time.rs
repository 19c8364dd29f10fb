use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Milliseconds since the Unix epoch, used as the stamp of synthesized question ids.
pub(crate) fn unix_millis(value: PrimitiveDateTime) -> i128 {
    value.assume_utc().unix_timestamp_nanos() / 1_000_000
}
