//! Fuzz target: path template compilation.
//!
//! Feeds arbitrary text into the template compiler. Compilation must
//! never panic, and for accepted templates it must be deterministic and
//! agree with itself on the declared parameter count.

#![no_main]

use libfuzzer_sys::fuzz_target;
use switchyard_core::CompiledPath;

fuzz_target!(|data: &[u8]| {
    let Ok(template) = std::str::from_utf8(data) else {
        return;
    };

    let first = CompiledPath::compile(template);
    let second = CompiledPath::compile(template);
    assert_eq!(first, second, "compilation must be deterministic");

    if let Ok(path) = first {
        assert_eq!(
            path.params().count(),
            path.param_count(),
            "param_count must agree with the declared parameter list"
        );
        // A compiled template must structurally match its own literal
        // rendering when it has no parameters.
        if path.param_count() == 0 {
            assert!(
                path.match_path(template).is_some(),
                "a parameterless template must match its own text"
            );
        }
    }
});
