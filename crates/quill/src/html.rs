// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The HTML-safety contract the core exposes to a template render loop
//! (spec.md §6): recognizing [`Object::HtmlSafe`] and the `html_escape`
//! function every other value's display form is expected to pass through at
//! an output site. The core never calls `html_escape` itself — escaping
//! happens at render call sites, outside this crate.

use crate::object::Object;

/// Replaces `& < > " '` with their named entities. Applied by a template
/// render loop to the `to_string()` of any [`Object`] that is not already an
/// [`Object::HtmlSafe`].
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// The full contract: an [`Object::HtmlSafe`] value's bytes pass through
/// unescaped; every other value is stringified then escaped.
pub fn html_escape(value: &Object) -> String {
    match value {
        Object::HtmlSafe(s) => s.as_ref().clone(),
        other => escape(&other.to_display_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_all_five_characters() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn html_safe_bypasses_escaping() {
        let safe = Object::html_safe("<b>hi</b>");
        assert_eq!(html_escape(&safe), "<b>hi</b>");
    }

    #[test]
    fn plain_string_is_escaped() {
        let unsafe_ = Object::string("<b>hi</b>");
        assert_eq!(html_escape(&unsafe_), "&lt;b&gt;hi&lt;/b&gt;");
    }
}
