use crate::models::billing::SubscriptionRow;

/// Upload limit for a user: `None` means unlimited.
pub fn resume_quota(subscription: Option<&SubscriptionRow>, free_quota: i64) -> Option<i64> {
    match subscription {
        Some(sub) if sub.is_active() => None,
        _ => Some(free_quota),
    }
}
