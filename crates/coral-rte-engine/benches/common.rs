// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_markup(paragraphs: usize) -> String {
    let base = "<p>The cat sat on the <b>mat</b> while <a href=\"/dog\">the dog</a> watched.</p>\
                <ul><li>first <i>item</i></li><li>second<br>line</li></ul>";
    base.repeat(paragraphs)
}

#[allow(dead_code)]
pub fn generate_nested_markup(depth: usize) -> String {
    let mut markup = String::new();
    for level in 0..depth {
        markup.push_str(&format!("<div><p>level {level} text with a cat</p>"));
    }
    markup.push_str(&"</div>".repeat(depth));
    markup
}
