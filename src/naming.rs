//! Name derivation for lists: key "UserPost" -> path "user-posts", label "User Posts", collection "user_posts".

/// Split a key into lowercase words on case changes, underscores, dashes and spaces.
/// e.g. "UserPost" -> ["user", "post"], "api_key" -> ["api", "key"]
fn words(key: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in key.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// English plural of a single word. Handles the common suffix rules only.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    if lower.ends_with('s') || lower.ends_with('x') || lower.ends_with("ch") || lower.ends_with("sh") {
        return format!("{}es", word);
    }
    if lower.ends_with('y') {
        let before = lower.chars().rev().nth(1);
        if !matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{}s", word)
}

/// Inverse of [`pluralize`] for the same suffix rules.
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.ends_with("ies") && word.len() > 3 {
        return format!("{}y", &word[..word.len() - 3]);
    }
    for suffix in ["ches", "shes", "sses", "xes"] {
        if lower.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if lower.ends_with('s') && !lower.ends_with("ss") && word.len() > 1 {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Apply `f` to the last word of a space separated phrase.
fn map_last_word(phrase: &str, f: impl Fn(&str) -> String) -> String {
    match phrase.rsplit_once(' ') {
        Some((head, last)) => format!("{} {}", head, f(last)),
        None => f(phrase),
    }
}

/// "UserPost" -> "User Post"
pub fn key_to_label(key: &str) -> String {
    words(key).iter().map(|w| capitalize(w)).collect::<Vec<_>>().join(" ")
}

/// "UserPost" -> "user-post", or "user-posts" when `plural`.
pub fn key_to_path(key: &str, plural: bool) -> String {
    let mut parts = words(key);
    if plural {
        if let Some(last) = parts.last_mut() {
            *last = pluralize(last);
        }
    }
    parts.join("-")
}

/// "UserPost" -> "user_posts"; default table name for the native store.
pub fn key_to_collection(key: &str) -> String {
    let mut parts = words(key);
    if let Some(last) = parts.last_mut() {
        *last = pluralize(last);
    }
    parts.join("_")
}

/// Plural form of a label: "User Post" -> "User Posts".
pub fn plural_label(label: &str) -> String {
    map_last_word(label, pluralize)
}

/// Singular form of a label: "User Posts" -> "User Post".
pub fn singular_label(label: &str) -> String {
    map_last_word(label, singularize)
}
