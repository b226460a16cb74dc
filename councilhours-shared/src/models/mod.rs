/// Database models
///
/// - `member`: council members and roster replacement
/// - `activity`: per-label activity totals
/// - `notification`: outbound email queue

pub mod activity;
pub mod member;
pub mod notification;
