/// Route templates exposed by the roster service.
pub mod v1 {
    pub mod roster {
        pub const NEED_CHECK_IN: &str = "/events/{event_id}/users/need_check_in";
        pub const NEED_CHECK_OUT: &str =
            "/events/{event_id}/session_areas/{area_id}/need_check_out";
        pub const CHECK_IN: &str = "/events/{event_id}/users/{user_id}/check_in";
        pub const CHECK_OUT: &str = "/events/{event_id}/session_areas/{area_id}/users/{user_id}/check_out";
        pub const BULK_CHECK_IN: &str = "/events/{event_id}/bulk_check_in";
    }

    pub mod gates {
        pub const COLLECTION: &str = "/check_in_and_out_gates";
        pub const FOR_EVENT: &str = "/events/{event_id}/check_in_and_out_gates";
        pub const ITEM: &str = "/check_in_and_out_gates/{gate_id}";
        pub const SESSION_AREAS: &str = "/events/{event_id}/session_areas";
    }
}

/// Helper utilities for working with route templates
pub mod utils {
    use url::Url;

    /// Resolve a route template against `base`, substituting `{param}`
    /// segments. Values are pushed as single path segments, so ids that
    /// contain `/` or spaces are percent-encoded rather than splitting the
    /// path.
    pub fn resolve(
        base: &Url,
        route: &str,
        params: &[(&str, &str)],
    ) -> Url {
        let mut url = base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            for segment in route.split('/').filter(|s| !s.is_empty()) {
                let value = segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .and_then(|name| {
                        params
                            .iter()
                            .find(|(key, _)| *key == name)
                            .map(|(_, value)| *value)
                    })
                    .unwrap_or(segment);
                segments.push(value);
            }
        }
        url
    }

}
