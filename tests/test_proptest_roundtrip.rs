//! Property tests for the round-trip laws.
//!
//! - A symbol query printed and re-parsed preserves filter, kind, dir,
//!   and tokens.
//! - The hover pretty-printer is a fixed point on its own output
//!   (modulo terminal newline), for tag-free formatter shapes.

use proptest::prelude::*;

use golangd::ide::hover::pretty_print_types_string;
use golangd::ide::Query;

// ---------------------------------------------------------------------
// Query DSL round trip
// ---------------------------------------------------------------------

fn token_strategy() -> impl Strategy<Value = String> {
    // lowercase, no kind keywords, no separators
    "[a-z][a-z0-9]{0,8}".prop_filter("kind keywords parse specially", |t| {
        !matches!(
            t.as_str(),
            "package" | "type" | "method" | "field" | "func" | "var" | "const"
        ) && t != "is"
    })
}

fn query_strategy() -> impl Strategy<Value = String> {
    let filter = prop_oneof![
        Just(String::new()),
        Just("is:exported".to_string()),
        "[a-z]{1,6}(/[a-z]{1,6}){0,2}".prop_map(|d| format!("dir:{d}")),
    ];
    let kind = prop_oneof![
        Just(String::new()),
        Just("type".to_string()),
        Just("func".to_string()),
        Just("method".to_string()),
    ];
    let tokens = prop::collection::vec(token_strategy(), 0..4);
    (filter, kind, tokens).prop_map(|(filter, kind, tokens)| {
        let mut parts = Vec::new();
        if !filter.is_empty() {
            parts.push(filter);
        }
        if !kind.is_empty() {
            parts.push(kind);
        }
        parts.extend(tokens);
        parts.join(" ")
    })
}

proptest! {
    #[test]
    fn query_print_parse_round_trip(raw in query_strategy()) {
        let query = Query::parse(&raw);
        let reparsed = Query::parse(&query.to_string());

        prop_assert_eq!(query.filter, reparsed.filter);
        prop_assert_eq!(query.kind, reparsed.kind);
        prop_assert_eq!(query.dir, reparsed.dir);
        prop_assert_eq!(query.tokens, reparsed.tokens);
    }
}

// ---------------------------------------------------------------------
// Pretty-printer fixed point
// ---------------------------------------------------------------------

fn field_strategy() -> impl Strategy<Value = String> {
    (
        "[A-Z][a-z]{0,6}",
        prop_oneof![
            Just("int".to_string()),
            Just("string".to_string()),
            Just("[]byte".to_string()),
            Just("map[string]int".to_string()),
        ],
    )
        .prop_map(|(name, ty)| format!("{name} {ty}"))
}

fn type_body_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(field_strategy(), 0..5).prop_map(|fields| {
        if fields.is_empty() {
            "struct{}".to_string()
        } else {
            format!("struct{{{}}}", fields.join("; "))
        }
    })
}

proptest! {
    #[test]
    fn pretty_printer_fixed_point(body in type_body_strategy()) {
        let once = pretty_print_types_string(&body);
        let twice = pretty_print_types_string(&once);
        prop_assert_eq!(
            once.trim_end_matches('\n'),
            twice.trim_end_matches('\n')
        );
    }

    #[test]
    fn pretty_printer_preserves_field_text(body in type_body_strategy()) {
        let pretty = pretty_print_types_string(&body);
        // every field line of the input survives into the output
        if let Some(inner) = body
            .strip_prefix("struct{")
            .and_then(|s| s.strip_suffix('}'))
        {
            for field in inner.split("; ").filter(|f| !f.is_empty()) {
                prop_assert!(pretty.contains(field));
            }
        }
    }
}
