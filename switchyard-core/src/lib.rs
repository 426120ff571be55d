//! Core routing types for the Switchyard dispatch engine.
//!
//! Defines path templates and their compiler, the closed parameter
//! converter set, the ordered route table, and the reference linear-scan
//! matcher that every other matcher implementation is measured against.
//!
//! See `docs/ARCHITECTURE.md` for design rationale.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod convert;
pub mod error;
pub mod outcome;
pub mod route;
pub mod router;
pub mod template;

pub use convert::{ParamKind, ParamValue};
pub use error::{CompileError, UrlError};
pub use outcome::{MatchOutcome, Matcher, MatcherFault, ParamError, PathParams, RouteMatch};
pub use route::{MethodSet, Route, RouteId};
pub use router::Router;
pub use template::{CompiledPath, ParamSpec, Segment, MAX_PARAMS};

#[cfg(test)]
mod tests {
    use http::Method;
    use uuid::Uuid;

    use super::*;

    fn table(entries: &[(&[Method], &str)]) -> Router<()> {
        let mut router = Router::new();
        for (methods, template) in entries {
            match router.add_route(methods.iter().cloned(), template, ()) {
                Ok(_) => {}
                Err(e) => panic!("registration of '{template}' failed: {e}"),
            }
        }
        router
    }

    #[test]
    fn compile_literal_template_keeps_segments_in_order() {
        let path = match CompiledPath::compile("/api/v1/health") {
            Ok(p) => p,
            Err(e) => panic!("unexpected error: {e}"),
        };
        let segments: Vec<_> = path.segments().to_vec();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("api".to_owned()),
                Segment::Literal("v1".to_owned()),
                Segment::Literal("health".to_owned()),
            ],
            "literal segments must appear in template order"
        );
        assert_eq!(path.param_count(), 0);
    }

    #[test]
    fn compile_defaults_unannotated_param_to_str() {
        let path = match CompiledPath::compile("/users/{name}") {
            Ok(p) => p,
            Err(e) => panic!("unexpected error: {e}"),
        };
        let params: Vec<_> = path.params().collect();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "name");
        assert_eq!(params[0].kind, ParamKind::Str, "bare {{name}} must default to str");
    }

    #[test]
    fn compile_resolves_each_typed_converter() {
        let path = match CompiledPath::compile("/a/{i:int}/{f:float}/{u:uuid}/{s:str}") {
            Ok(p) => p,
            Err(e) => panic!("unexpected error: {e}"),
        };
        let kinds: Vec<_> = path.params().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![ParamKind::Int, ParamKind::Float, ParamKind::Uuid, ParamKind::Str],
            "converter annotations must resolve in declaration order"
        );
    }

    #[test]
    fn compile_root_template_has_zero_segments() {
        let path = match CompiledPath::compile("/") {
            Ok(p) => p,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert!(path.segments().is_empty(), "'/' must compile to zero segments");
        assert_eq!(path.match_path("/"), Some(vec![]));
        assert_eq!(path.match_path("/x"), None);
    }

    #[test]
    fn compile_rejects_template_without_leading_slash() {
        assert!(matches!(
            CompiledPath::compile("users/{id}"),
            Err(CompileError::MissingLeadingSlash { .. })
        ));
    }

    #[test]
    fn compile_rejects_empty_segments() {
        assert!(matches!(
            CompiledPath::compile("/users//posts"),
            Err(CompileError::EmptySegment { .. })
        ));
        assert!(matches!(
            CompiledPath::compile("/users/"),
            Err(CompileError::EmptySegment { .. }),
        ), "trailing slash is an empty segment");
    }

    #[test]
    fn compile_rejects_param_not_spanning_whole_segment() {
        assert!(matches!(
            CompiledPath::compile("/file-{id}"),
            Err(CompileError::PartialParam { .. })
        ));
        assert!(matches!(
            CompiledPath::compile("/{id}.json"),
            Err(CompileError::PartialParam { .. })
        ));
    }

    #[test]
    fn compile_rejects_unknown_converter_by_name() {
        match CompiledPath::compile("/items/{id:slug}") {
            Err(CompileError::UnknownConverter { name, converter }) => {
                assert_eq!(name, "id");
                assert_eq!(converter, "slug");
            }
            other => panic!("expected UnknownConverter, got {other:?}"),
        }
    }

    #[test]
    fn compile_rejects_duplicate_param_names() {
        assert!(matches!(
            CompiledPath::compile("/{id}/x/{id:int}"),
            Err(CompileError::DuplicateParam { .. })
        ));
    }

    #[test]
    fn compile_rejects_invalid_identifier() {
        assert!(matches!(
            CompiledPath::compile("/{9lives}"),
            Err(CompileError::InvalidParamName { .. })
        ));
        assert!(matches!(
            CompiledPath::compile("/{}"),
            Err(CompileError::InvalidParamName { .. })
        ));
    }

    #[test]
    fn compile_rejects_more_params_than_the_limit() {
        let template: String =
            (0..=MAX_PARAMS).map(|i| format!("/{{p{i}}}")).collect();
        match CompiledPath::compile(&template) {
            Err(CompileError::TooManyParams { count, limit }) => {
                assert_eq!(count, MAX_PARAMS + 1);
                assert_eq!(limit, MAX_PARAMS);
            }
            other => panic!("expected TooManyParams, got {other:?}"),
        }
    }

    #[test]
    fn match_path_is_structural_and_kind_blind() {
        let path = match CompiledPath::compile("/convert/{value:int}") {
            Ok(p) => p,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(
            path.match_path("/convert/abc"),
            Some(vec!["abc"]),
            "structure must match before conversion runs"
        );
        assert_eq!(path.match_path("/convert"), None, "length mismatch must not match");
        assert_eq!(path.match_path("/convert/12/x"), None);
        assert_eq!(path.match_path("/convert/12/"), None, "trailing slash is a different path");
    }

    #[test]
    fn int_converter_accepts_digits_only() {
        assert_eq!(ParamKind::Int.parse("42"), Some(ParamValue::Int(42)));
        assert_eq!(ParamKind::Int.parse("007"), Some(ParamValue::Int(7)));
        assert_eq!(ParamKind::Int.parse("-1"), None, "sign is not part of the int shape");
        assert_eq!(ParamKind::Int.parse("1x"), None);
        assert_eq!(ParamKind::Int.parse(""), None);
    }

    #[test]
    fn int_converter_rejects_overflow() {
        assert_eq!(
            ParamKind::Int.parse("9223372036854775807"),
            Some(ParamValue::Int(i64::MAX))
        );
        assert_eq!(
            ParamKind::Int.parse("9223372036854775808"),
            None,
            "values beyond i64::MAX must be conversion failures"
        );
    }

    #[test]
    fn float_converter_accepts_digit_dot_digit_shapes_only() {
        assert_eq!(ParamKind::Float.parse("3.25"), Some(ParamValue::Float(3.25)));
        assert_eq!(ParamKind::Float.parse("10"), Some(ParamValue::Float(10.0)));
        assert_eq!(ParamKind::Float.parse(".5"), None, "leading dot is not accepted");
        assert_eq!(ParamKind::Float.parse("5."), None, "trailing dot is not accepted");
        assert_eq!(ParamKind::Float.parse("1e3"), None, "exponents are not accepted");
        assert_eq!(ParamKind::Float.parse("-1.0"), None);
    }

    #[test]
    fn uuid_converter_accepts_lowercase_hyphenated_form_only() {
        let canonical = "550e8400-e29b-41d4-a716-446655440000";
        match ParamKind::Uuid.parse(canonical) {
            Some(ParamValue::Uuid(u)) => assert_eq!(u.to_string(), canonical),
            other => panic!("expected uuid value, got {other:?}"),
        }
        assert_eq!(
            ParamKind::Uuid.parse("550E8400-E29B-41D4-A716-446655440000"),
            None,
            "uppercase hex is not part of the uuid shape"
        );
        assert_eq!(
            ParamKind::Uuid.parse("550e8400e29b41d4a716446655440000"),
            None,
            "the 32-char form without hyphens is not accepted"
        );
    }

    #[test]
    fn resolve_first_registered_route_wins_on_shadowed_path() {
        let router = table(&[
            (&[Method::GET], "/users/{name}"),
            (&[Method::GET], "/users/me"),
        ]);
        match router.resolve(&Method::GET, "/users/me") {
            MatchOutcome::Matched(m) => {
                assert_eq!(m.route, RouteId(0), "registration order beats specificity");
                assert_eq!(m.params.get("name"), Some(&ParamValue::Str("me".to_owned())));
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn resolve_unknown_path_is_not_found() {
        let router = table(&[(&[Method::GET], "/users/{id:int}")]);
        assert_eq!(router.resolve(&Method::GET, "/posts/1"), MatchOutcome::NotFound);
        assert_eq!(
            router.resolve(&Method::GET, "users/1"),
            MatchOutcome::NotFound,
            "a path without a leading slash has no structure"
        );
    }

    #[test]
    fn resolve_method_mismatch_unions_allowed_across_routes() {
        let router = table(&[
            (&[Method::GET], "/things/{id}"),
            (&[Method::POST], "/things/{id}"),
        ]);
        match router.resolve(&Method::DELETE, "/things/7") {
            MatchOutcome::MethodNotAllowed { allowed } => {
                assert_eq!(
                    allowed,
                    MethodSet::new([Method::GET, Method::HEAD, Method::POST]),
                    "allowed must be the union over every structural match"
                );
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn resolve_scans_past_method_denied_routes_to_a_full_match() {
        let router = table(&[
            (&[Method::GET], "/things/{id}"),
            (&[Method::POST], "/things/{id}"),
        ]);
        match router.resolve(&Method::POST, "/things/7") {
            MatchOutcome::Matched(m) => assert_eq!(
                m.route,
                RouteId(1),
                "a later full match must win over an earlier partial one"
            ),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn resolve_registering_get_also_answers_head() {
        let router = table(&[(&[Method::GET], "/health")]);
        assert!(
            router.resolve(&Method::HEAD, "/health").is_match(),
            "GET registration must imply HEAD"
        );
    }

    #[test]
    fn resolve_conversion_failure_ends_the_whole_scan() {
        // A str-kind route with the same shape is registered later; it must
        // NOT rescue the request once the winner's converter rejects.
        let router = table(&[
            (&[Method::GET], "/convert/{value:int}"),
            (&[Method::GET], "/convert/{value}"),
        ]);
        match router.resolve(&Method::GET, "/convert/abc") {
            MatchOutcome::InvalidParam(e) => {
                assert_eq!(e.route, RouteId(0));
                assert_eq!(e.name, "value");
                assert_eq!(e.value, "abc");
                assert_eq!(e.kind, ParamKind::Int);
            }
            other => panic!("expected InvalidParam, got {other:?}"),
        }
    }

    #[test]
    fn resolve_converts_each_capture_with_its_declared_kind() {
        let router = table(&[(&[Method::GET], "/orders/{id:int}/items/{price:float}")]);
        match router.resolve(&Method::GET, "/orders/15/items/9.99") {
            MatchOutcome::Matched(m) => {
                assert_eq!(m.params.get("id"), Some(&ParamValue::Int(15)));
                assert_eq!(m.params.get("price"), Some(&ParamValue::Float(9.99)));
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn register_rejects_empty_method_set() {
        let mut router: Router<()> = Router::new();
        assert!(matches!(
            router.add_route(std::iter::empty::<Method>(), "/x", ()),
            Err(CompileError::EmptyMethods { .. })
        ));
    }

    #[test]
    fn method_set_is_canonical_regardless_of_input_order() {
        let a = MethodSet::new([Method::POST, Method::GET, Method::GET]);
        let b = MethodSet::new([Method::GET, Method::POST]);
        assert_eq!(a, b, "order and duplicates must not affect equality");
        assert_eq!(a.to_string(), "GET, POST", "Display must use canonical order");
    }

    #[test]
    fn url_for_builds_a_path_that_rematches_the_same_route() {
        let mut router: Router<()> = Router::new();
        let id = match router.add_named_route(
            [Method::GET],
            "/users/{id:int}/posts/{slug}",
            (),
            "user_post",
        ) {
            Ok(id) => id,
            Err(e) => panic!("registration failed: {e}"),
        };

        let url = match router.url_for(
            "user_post",
            &[ParamValue::Int(7), ParamValue::Str("intro".to_owned())],
        ) {
            Ok(u) => u,
            Err(e) => panic!("url_for failed: {e}"),
        };
        assert_eq!(url, "/users/7/posts/intro");

        match router.resolve(&Method::GET, &url) {
            MatchOutcome::Matched(m) => assert_eq!(m.route, id, "built URL must round-trip"),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn url_for_reports_unknown_name_arity_and_kind_errors() {
        let mut router: Router<()> = Router::new();
        if let Err(e) = router.add_named_route([Method::GET], "/users/{id:int}", (), "user") {
            panic!("registration failed: {e}");
        }

        assert!(matches!(
            router.url_for("missing", &[]),
            Err(UrlError::UnknownRoute { .. })
        ));
        assert!(matches!(
            router.url_for("user", &[]),
            Err(UrlError::ArityMismatch { expected: 1, got: 0, .. })
        ));
        assert!(matches!(
            router.url_for("user", &[ParamValue::Str("7".to_owned())]),
            Err(UrlError::KindMismatch { .. })
        ));
    }

    #[test]
    fn url_for_root_route_is_slash() {
        let mut router: Router<()> = Router::new();
        if let Err(e) = router.add_named_route([Method::GET], "/", (), "index") {
            panic!("registration failed: {e}");
        }
        match router.url_for("index", &[]) {
            Ok(url) => assert_eq!(url, "/"),
            Err(e) => panic!("url_for failed: {e}"),
        }
    }

    #[test]
    fn matcher_trait_reference_impl_never_faults() {
        let router = table(&[(&[Method::GET], "/a")]);
        let matcher: &dyn Matcher = &router;
        match matcher.resolve(&Method::GET, "/a") {
            Ok(outcome) => assert!(outcome.is_match()),
            Err(fault) => panic!("reference matcher must not fault: {fault}"),
        }
    }

    proptest::proptest! {
        #[test]
        fn proptest_compile_is_deterministic(
            literals in proptest::collection::vec(
                proptest::sample::select(vec!["api", "users", "items", "v1", "static"]),
                0..4usize,
            ),
        ) {
            let mut template = String::new();
            for lit in &literals {
                template.push('/');
                template.push_str(lit);
            }
            template.push_str("/{id:int}");
            let a = CompiledPath::compile(&template);
            let b = CompiledPath::compile(&template);
            proptest::prop_assert_eq!(a, b, "compiling twice must give identical results");
        }

        #[test]
        fn proptest_int_values_round_trip_through_display(value in 0..i64::MAX) {
            let rendered = ParamValue::Int(value).to_string();
            proptest::prop_assert_eq!(
                ParamKind::Int.parse(&rendered),
                Some(ParamValue::Int(value)),
                "Display output must re-parse to the same value"
            );
        }

        #[test]
        fn proptest_resolve_is_pure(
            segments in proptest::collection::vec(
                proptest::sample::select(vec!["users", "me", "42", "abc", "x"]),
                0..4usize,
            ),
        ) {
            let router = table(&[
                (&[Method::GET], "/users/{id:int}"),
                (&[Method::POST], "/users/{name}"),
                (&[Method::GET], "/users/me/inbox"),
            ]);
            let mut path = String::new();
            for seg in &segments {
                path.push('/');
                path.push_str(seg);
            }
            if path.is_empty() {
                path.push('/');
            }
            let first = router.resolve(&Method::GET, &path);
            let second = router.resolve(&Method::GET, &path);
            proptest::prop_assert_eq!(first, second, "resolution must be deterministic");
        }
    }
}
