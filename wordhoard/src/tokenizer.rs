/// Characters removed from a line before it is split into words
const STRIPPED_CHARS: [char; 6] = [',', '"', '/', '.', '»', '«'];

/// Splits a line into normalized words.
///
/// The stripped punctuation is removed first, so `foo.bar` becomes the single
/// word `foobar` rather than two words. The remainder is lowercased and split on
/// runs of whitespace.
pub fn tokenize(line: &str) -> Vec<String> {
    let cleaned: String = line
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect();

    cleaned
        .to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}
