#![no_main]

#[macro_use]
extern crate libfuzzer_sys;
extern crate multiscan;

use multiscan::{Expr, RegexBuilder};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if Expr::parse_tree(s).is_ok() {
            // anything that parses must compile and run without panicking
            if let Ok(re) = RegexBuilder::new(s).backtrack_limit(10_000).build() {
                let _ = re.find(s);
            }
        }
    }
});
