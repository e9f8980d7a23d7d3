/// Lowercases and replaces non-alphanumeric runs with single hyphens.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_was_hyphen = true;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn basic_title() {
        assert_eq!(slugify("Senior Rust Engineer"), "senior-rust-engineer");
    }

    #[test]
    fn collapses_punctuation_runs() {
        assert_eq!(slugify("C++ / Rust -- Developer!"), "c-rust-developer");
    }

    #[test]
    fn empty_input() {
        assert_eq!(slugify(""), "");
    }
}
