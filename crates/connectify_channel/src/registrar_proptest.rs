#[cfg(test)]
mod tests {
    use crate::payload::ChannelRegistrationPayload;
    use crate::registrar::should_update;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn payload_strategy() -> impl Strategy<Value = ChannelRegistrationPayload> {
        (
            any::<bool>(),
            any::<bool>(),
            proptest::collection::btree_set("[a-z]{1,6}", 0..4),
            proptest::option::of("[a-z0-9]{4,8}"),
        )
            .prop_map(|(opt_in, background, tags, named_user)| {
                let mut payload = ChannelRegistrationPayload::new("linux")
                    .with_opt_in(opt_in)
                    .with_background(background)
                    .with_tags(tags);
                if let Some(named_user) = named_user {
                    payload = payload.with_named_user(named_user);
                }
                payload
            })
    }

    proptest! {
        // Equal payloads inside the interval never trigger an update
        #[test]
        fn test_equal_payloads_within_interval(
            payload in payload_strategy(),
            elapsed_minutes in 0..(24 * 60i64),
        ) {
            let last_update = Utc.with_ymd_and_hms(2025, 5, 5, 9, 0, 0).unwrap();
            let now = last_update + Duration::minutes(elapsed_minutes);

            prop_assert!(!should_update(
                &payload,
                Some(&payload.clone()),
                Some(last_update),
                now,
                Duration::hours(24),
            ));
        }

        // Equal payloads at or past the interval always trigger an update
        #[test]
        fn test_equal_payloads_after_interval(
            payload in payload_strategy(),
            elapsed_minutes in (24 * 60i64)..(90 * 24 * 60i64),
        ) {
            let last_update = Utc.with_ymd_and_hms(2025, 5, 5, 9, 0, 0).unwrap();
            let now = last_update + Duration::minutes(elapsed_minutes);

            prop_assert!(should_update(
                &payload,
                Some(&payload.clone()),
                Some(last_update),
                now,
                Duration::hours(24),
            ));
        }

        // Different payloads update regardless of elapsed time
        #[test]
        fn test_different_payloads_always_update(
            current in payload_strategy(),
            last in payload_strategy(),
            elapsed_minutes in 0..(48 * 60i64),
        ) {
            prop_assume!(current != last);
            let last_update = Utc.with_ymd_and_hms(2025, 5, 5, 9, 0, 0).unwrap();
            let now = last_update + Duration::minutes(elapsed_minutes);

            prop_assert!(should_update(
                &current,
                Some(&last),
                Some(last_update),
                now,
                Duration::hours(24),
            ));
        }

        // Without an acknowledged payload there is always an update
        #[test]
        fn test_missing_last_payload_always_updates(
            payload in payload_strategy(),
            elapsed_minutes in 0..(48 * 60i64),
            has_last_update in any::<bool>(),
        ) {
            let last_update = Utc.with_ymd_and_hms(2025, 5, 5, 9, 0, 0).unwrap();
            let now = last_update + Duration::minutes(elapsed_minutes);

            prop_assert!(should_update(
                &payload,
                None,
                has_last_update.then_some(last_update),
                now,
                Duration::hours(24),
            ));
        }
    }

    #[test]
    fn test_missing_last_update_counts_as_elapsed() {
        let payload = ChannelRegistrationPayload::new("linux");
        let now = Utc.with_ymd_and_hms(2025, 5, 5, 9, 0, 0).unwrap();
        assert!(should_update(
            &payload,
            Some(&payload),
            None,
            now,
            Duration::hours(24)
        ));
    }
}
