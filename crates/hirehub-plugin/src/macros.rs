//! Convenience macros for plugin development.

/// Macro for quickly building a `HookPayload` from key/value pairs.
///
/// # Example
/// ```rust,ignore
/// let payload = hook_payload!({
///     "job_id" => json!("job-42"),
///     "title" => json!("Staff Engineer"),
/// });
/// let payload = hook_payload!(actor: recruiter_id, {
///     "candidate_id" => json!(candidate_id),
/// });
/// ```
#[macro_export]
macro_rules! hook_payload {
    () => {
        $crate::hooks::definitions::HookPayload::empty()
    };
    ({ $($key:expr => $value:expr),* $(,)? }) => {{
        let payload = $crate::hooks::definitions::HookPayload::empty();
        $(
            let payload = payload.with_field($key, $value);
        )*
        payload
    }};
    (actor: $actor:expr, { $($key:expr => $value:expr),* $(,)? }) => {{
        let payload = $crate::hooks::definitions::HookPayload::empty().with_actor($actor);
        $(
            let payload = payload.with_field($key, $value);
        )*
        payload
    }};
}
