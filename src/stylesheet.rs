//! Makes sure each article links the shared stylesheet for auto-generated
//! content. Idempotent: a document that already carries the link passes
//! through untouched.

pub const UPDATE_STYLESHEET: &str = "../update_content.css";

/// Inserts the stylesheet link before `</head>` when absent. Returns the
/// (possibly new) HTML and whether anything changed. Documents without a
/// head are left alone.
pub fn ensure_link(html: &str) -> (String, bool) {
    if html.contains(UPDATE_STYLESHEET) {
        return (html.to_owned(), false);
    }
    let at = match html.find("</head>") {
        None => return (html.to_owned(), false),
        Some(at) => at,
    };
    let link = format!(
        "    <link rel=\"stylesheet\" href=\"{}\">\n",
        UPDATE_STYLESHEET
    );
    let mut out = String::with_capacity(html.len() + link.len());
    out.push_str(&html[..at]);
    out.push_str(&link);
    out.push_str(&html[at..]);
    (out, true)
}
