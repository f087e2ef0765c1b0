//! Source-level rewrites applied by the live-reload service.

use std::path::Path;

use url::Url;

/// Insert a module script tag right after the opening `<head>` tag, or at
/// the start of the document when there is none. No-op if already present.
pub fn inject_client_script(html: &str, script_src: &str) -> String {
    if html.contains(script_src) {
        return html.to_string();
    }
    let tag = format!("<script type=\"module\" src=\"{}\"></script>", script_src);
    match head_open_end(html) {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..at]);
            out.push_str(&tag);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{}{}", tag, html),
    }
}

/// Byte offset just past the `<head ...>` opening tag.
fn head_open_end(html: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = html[from..].find("<head") {
        let start = from + pos;
        let rest = &html[start + 5..];
        match rest.chars().next() {
            Some('>') => return Some(start + 6),
            Some(c) if c.is_whitespace() => return rest.find('>').map(|i| start + 5 + i + 1),
            // <header> and friends
            _ => from = start + 5,
        }
    }
    None
}

/// Rewrite `./`-relative `src`/`href` values to root-absolute ones so they
/// resolve the same under any page URL.
pub fn absolutize_relative_urls(html: &str) -> String {
    let mut out = html.to_string();
    for attr in ["src", "href"] {
        for quote in ['"', '\''] {
            let from = format!("{}={}./", attr, quote);
            let to = format!("{}={}/", attr, quote);
            out = out.replace(&from, &to);
        }
    }
    out
}

/// Rewrite absolute frames under `root` to root-relative `/...` locations
/// and drop module version tags.
pub fn rewrite_stack(stack: &str, root: &Path) -> String {
    let mut out = stack.to_string();
    if let Ok(url) = Url::from_directory_path(root) {
        out = out.replace(url.as_str(), "/");
    }
    let plain = format!("{}/", root.display().to_string().trim_end_matches('/'));
    out = out.replace(&plain, "/");
    strip_version_tags(&out)
}

/// Remove `?v=<digits>` suffixes from module URLs.
fn strip_version_tags(stack: &str) -> String {
    let mut out = String::with_capacity(stack.len());
    let mut rest = stack;
    while let Some(pos) = rest.find("?v=") {
        let digits = rest[pos + 3..].chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            out.push_str(&rest[..pos + 3]);
        } else {
            out.push_str(&rest[..pos]);
        }
        rest = &rest[pos + 3 + digits..];
    }
    out.push_str(rest);
    out
}
