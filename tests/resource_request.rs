// tests/resource_request.rs

use std::time::Duration;

use proptest::prelude::*;

use gridrun::errors::GridError;
use gridrun::task::resource::{parse_duration, ScalarValue};
use gridrun::task::{MemorySize, ResourceRequest, ResourceSpec, TimeSpan};

fn hours(h: u64) -> TimeSpan {
    TimeSpan::new(Duration::from_secs(h * 3600))
}

#[test]
fn scalar_sets_request_and_limit() {
    let r = ResourceRequest::<TimeSpan>::parse(&ResourceSpec::scalar("1h")).unwrap();
    assert_eq!(r.request(), Some(&hours(1)));
    assert_eq!(r.limit(), Some(&hours(1)));
}

#[test]
fn request_only_leaves_limit_unset() {
    let r = ResourceRequest::<TimeSpan>::parse(&ResourceSpec::map(Some("2h"), None)).unwrap();
    assert_eq!(r.request(), Some(&hours(2)));
    assert_eq!(r.limit(), None);
    assert_eq!(r.effective_limit(), &hours(2));
}

#[test]
fn limit_only_implies_request() {
    let r = ResourceRequest::<TimeSpan>::parse(&ResourceSpec::map(None, Some("4h"))).unwrap();
    assert_eq!(r.request(), Some(&hours(4)));
    assert_eq!(r.limit(), Some(&hours(4)));
}

#[test]
fn both_keys_are_kept_as_given() {
    let r = ResourceRequest::<TimeSpan>::parse(&ResourceSpec::map(Some("2h"), Some("4h"))).unwrap();
    assert_eq!(r.request(), Some(&hours(2)));
    assert_eq!(r.limit(), Some(&hours(4)));
    assert_eq!(r.effective_request(), &hours(2));
    assert_eq!(r.effective_limit(), &hours(4));
}

#[test]
fn empty_map_is_a_config_error() {
    let err = ResourceRequest::<TimeSpan>::parse(&ResourceSpec::map(None, None)).unwrap_err();
    assert!(matches!(err, GridError::ConfigError(_)), "got {err:?}");

    let err = ResourceRequest::<MemorySize>::parse(&ResourceSpec::map(None, None)).unwrap_err();
    assert!(matches!(err, GridError::ConfigError(_)), "got {err:?}");
}

#[test]
fn unparsable_values_are_config_errors() {
    for bad in ["soon", "1 fortnight", "", "h"] {
        let err = ResourceRequest::<TimeSpan>::parse(&ResourceSpec::scalar(bad)).unwrap_err();
        assert!(matches!(err, GridError::ConfigError(_)), "{bad:?} gave {err:?}");
    }
    for bad in ["lots", "4 XB", "GB"] {
        let err = ResourceRequest::<MemorySize>::parse(&ResourceSpec::scalar(bad)).unwrap_err();
        assert!(matches!(err, GridError::ConfigError(_)), "{bad:?} gave {err:?}");
    }
}

#[test]
fn oversized_values_are_config_errors_not_panics() {
    for huge in ["99999999999999999999999d", "18446744073709551615s 1d"] {
        let err = ResourceRequest::<TimeSpan>::parse(&ResourceSpec::scalar(huge)).unwrap_err();
        assert!(matches!(err, GridError::ConfigError(_)), "{huge:?} gave {err:?}");
    }
    assert!(parse_duration("100000000000000000000000h").is_err());

    let err = ResourceRequest::<MemorySize>::parse(&ResourceSpec::scalar("99999999999 PB")).unwrap_err();
    assert!(matches!(err, GridError::ConfigError(_)), "got {err:?}");
}

#[test]
fn bare_integers_are_seconds_and_bytes() {
    let t = ResourceRequest::<TimeSpan>::parse(&ResourceSpec::Scalar(ScalarValue::Integer(90))).unwrap();
    assert_eq!(t.effective_limit().as_duration(), Duration::from_secs(90));

    let m = ResourceRequest::<MemorySize>::parse(&ResourceSpec::Scalar(ScalarValue::Integer(2048))).unwrap();
    assert_eq!(m.effective_limit().bytes(), 2048);
}

#[test]
fn durations_accept_compound_units() {
    assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
    assert_eq!(parse_duration("2d").unwrap(), Duration::from_secs(172_800));
    assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
    assert_eq!(parse_duration("1 hour 5 min").unwrap(), Duration::from_secs(3900));
}

#[test]
fn time_formats() {
    let t = TimeSpan::new(Duration::from_secs(26 * 3600 + 61));
    assert_eq!(t.to_hms(), "26:01:01");
    assert_eq!(t.as_minutes(), 26 * 60 + 2);
}

#[test]
fn memory_units_are_binary() {
    let parse = |s: &str| {
        ResourceRequest::<MemorySize>::parse(&ResourceSpec::scalar(s))
            .unwrap()
            .effective_limit()
            .bytes()
    };
    assert_eq!(parse("1 KB"), 1024);
    assert_eq!(parse("512 MB"), 512 << 20);
    assert_eq!(parse("4G"), 4 << 30);
    assert_eq!(parse("1.5 GB"), 3 << 29);
    assert_eq!(parse("2GiB"), 2 << 30);
    assert_eq!(MemorySize::from_bytes(3 << 29).to_string(), "1.5 GB");
    assert_eq!(MemorySize::from_bytes((1 << 20) + 1).as_mega(), 2);
}

proptest! {
    #[test]
    fn scalar_hours_round_trip_through_request_and_limit(h in 1u64..10_000) {
        let r = ResourceRequest::<TimeSpan>::parse(&ResourceSpec::scalar(format!("{h}h"))).unwrap();
        prop_assert_eq!(r.request(), r.limit());
        prop_assert_eq!(r.effective_limit().as_duration(), Duration::from_secs(h * 3600));
    }

    #[test]
    fn limit_is_never_missing_once_parsed(req in proptest::option::of(1u64..1_000), lim in proptest::option::of(1u64..1_000)) {
        prop_assume!(req.is_some() || lim.is_some());
        let req_s = req.map(|v| format!("{v}m"));
        let lim_s = lim.map(|v| format!("{v}m"));
        let r = ResourceRequest::<TimeSpan>::parse(&ResourceSpec::map(req_s.as_deref(), lim_s.as_deref())).unwrap();

        prop_assert!(r.request().is_some());
        let expected_limit = lim.or(req).unwrap();
        prop_assert_eq!(r.effective_limit().as_duration(), Duration::from_secs(expected_limit * 60));
        prop_assert_eq!(r.limit().is_none(), lim.is_none());
    }

    #[test]
    fn memory_megabytes_parse_exactly(mb in 1u64..1_000_000) {
        let r = ResourceRequest::<MemorySize>::parse(&ResourceSpec::scalar(format!("{mb} MB"))).unwrap();
        prop_assert_eq!(r.effective_limit().as_mega(), mb);
    }
}
