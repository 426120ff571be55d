//! Fuzz target: dual-matcher agreement on arbitrary request paths.
//!
//! A fixed route table exercising every converter kind and shadowing
//! pattern is mirrored into the trie matcher; for any fuzzed request
//! path the trie and the reference scan must return the same outcome,
//! converted values included.

#![no_main]

use http::Method;
use libfuzzer_sys::fuzz_target;
use switchyard_core::{Matcher, Router};
use switchyard_express::TrieMatcher;

fn table() -> Router<()> {
    let mut router = Router::new();
    let routes: &[(&[Method], &str)] = &[
        (&[Method::GET], "/"),
        (&[Method::GET], "/users/{id:int}"),
        (&[Method::POST], "/users/{name}"),
        (&[Method::GET], "/users/me/inbox"),
        (&[Method::GET, Method::PUT], "/files/{name}/meta"),
        (&[Method::GET], "/items/{price:float}"),
        (&[Method::DELETE], "/items/{token:uuid}"),
        (&[Method::GET], "/a/{x}/c"),
        (&[Method::GET], "/{y}/b/c"),
    ];
    for (methods, template) in routes {
        if let Err(e) = router.add_route(methods.iter().cloned(), template, ()) {
            panic!("fixed table must register: {e}");
        }
    }
    router
}

fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };

    let router = table();
    let trie = TrieMatcher::from_router(&router);

    for method in [Method::GET, Method::HEAD, Method::POST, Method::PUT, Method::DELETE] {
        let reference = router.resolve(&method, path);
        let accelerated = match Matcher::resolve(&trie, &method, path) {
            Ok(outcome) => outcome,
            Err(fault) => panic!("trie must not fault on {method} {path:?}: {fault}"),
        };
        assert_eq!(accelerated, reference, "matchers disagree on {method} {path:?}");
    }
});
