//! Collision-free file naming inside a folder.

use std::collections::HashSet;

/// Return `candidate` if it is not taken, otherwise the first free
/// `"name (n).ext"` variant for n = 1, 2, ...
///
/// With `preserve_extension` the counter goes before the extension
/// (`a.png` -> `a (1).png`); without it the counter is appended to the whole
/// name (`a.png` -> `a.png (1)`). A leading dot never starts an extension.
pub fn unique_name(existing: &HashSet<String>, candidate: &str, preserve_extension: bool) -> String {
    if !existing.contains(candidate) {
        return candidate.to_string();
    }

    let (stem, extension) = if preserve_extension {
        split_extension(candidate)
    } else {
        (candidate, "")
    };

    // At most existing.len() + 1 candidates are tried.
    let mut counter: usize = 1;
    loop {
        let name = format!("{} ({}){}", stem, counter, extension);
        if !existing.contains(&name) {
            return name;
        }
        counter += 1;
    }
}

/// Split `name` into stem and extension (extension keeps its dot).
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
