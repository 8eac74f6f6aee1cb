// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn set(key: &str, value: &str) -> Command {
    Command::Set {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn get(key: &str) -> Command {
    Command::Get {
        key: key.to_string(),
    }
}

#[parameterized(
    simple_set = { "set foo=bar", set("foo", "bar") },
    set_trims_fields = { "set  foo = bar  ", set("foo", "bar") },
    set_splits_on_first_equals = { "set a=b=c", set("a", "b=c") },
    set_with_surrounding_whitespace = { "\t set k=v\n", set("k", "v") },
    simple_get = { "get foo", get("foo") },
    get_trims_key = { "get   foo  ", get("foo") },
    get_keeps_inner_spaces = { "get foo bar", get("foo bar") },
    snapshot = { "snapshot", Command::Snapshot },
    snapshot_with_newline = { "snapshot\n", Command::Snapshot },
    sync = { "sync", Command::Sync },
)]
fn parses_valid_input(raw: &str, expected: Command) {
    assert_eq!(parse(raw).unwrap(), expected);
}

#[parameterized(
    empty = { "" },
    unknown_verb = { "delete foo" },
    get_without_key = { "get" },
    set_without_pair = { "set" },
    uppercase_verb = { "SET a=b" },
    plural_snapshot = { "snapshots" },
)]
fn rejects_unrecognized_input(raw: &str) {
    assert!(matches!(parse(raw), Err(ParseError::Unrecognized(_))));
}

#[test]
fn set_without_equals_is_malformed() {
    assert_eq!(
        parse("set foo"),
        Err(ParseError::MalformedSet("foo".to_string()))
    );
}

#[parameterized(
    empty_key = { "set =bar" },
    empty_value = { "set foo=" },
    blank_value = { "set foo=   " },
    blank_key = { "set   =bar" },
)]
fn rejects_empty_fields(raw: &str) {
    assert_eq!(parse(raw), Err(ParseError::EmptyField));
}

#[test]
fn snapshot_and_sync_reject_arguments() {
    assert_eq!(
        parse("snapshot now"),
        Err(ParseError::UnexpectedArgs("snapshot"))
    );
    assert_eq!(parse("sync all"), Err(ParseError::UnexpectedArgs("sync")));
}

#[test]
fn rejects_fields_longer_than_record_limit() {
    let long_key = "k".repeat(MAX_FIELD_LEN + 1);
    let err = parse(&format!("set {}=v", long_key)).unwrap_err();
    assert_eq!(
        err,
        ParseError::TooLong {
            field: "key",
            len: MAX_FIELD_LEN + 1
        }
    );

    let long_value = "v".repeat(MAX_FIELD_LEN + 1);
    let err = parse(&format!("set k={}", long_value)).unwrap_err();
    assert!(matches!(err, ParseError::TooLong { field: "value", .. }));
}

#[test]
fn accepts_fields_at_record_limit() {
    let key = "k".repeat(MAX_FIELD_LEN);
    assert_eq!(parse(&format!("get {}", key)).unwrap(), get(&key));
}

#[test]
fn unrecognized_message_mentions_missing_arguments() {
    let err = parse("get").unwrap_err();
    assert!(err.to_string().contains("are you missing arguments?"));
}

proptest::proptest! {
    #[test]
    fn set_line_parses_back(
        key in "[a-zA-Z0-9_.-]{1,32}",
        value in "[a-zA-Z0-9_.=-]{1,32}"
    ) {
        proptest::prop_assert_eq!(
            parse(&format!("set {}={}", key, value)).unwrap(),
            set(&key, &value)
        );
    }

    #[test]
    fn parse_never_panics(raw in "\\PC{0,64}") {
        let _ = parse(&raw);
    }
}
