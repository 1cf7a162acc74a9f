//! HTML rendering of the admin page.

use std::fmt::Write as _;

use crate::domain::{Identity, LinkSummary};

/// Escape text for inclusion in HTML element content or quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Render the link table for `identity` followed by the add form.
///
/// The form's hidden `user` field carries the caller's name so a submission
/// is owned by whoever loaded the page.
pub fn render(identity: &Identity, links: &[LinkSummary]) -> String {
    let user = escape_html(identity.as_str());
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Short links</title></head>\n<body>\n",
    );
    // Writing to a String cannot fail.
    let _ = writeln!(page, "<h1>Short links for {user}</h1>");
    page.push_str("<table>\n<tr><th>Name</th><th>URL</th><th>Hits</th><th></th></tr>\n");
    for link in links {
        let name = escape_html(link.name.as_str());
        let target = escape_html(link.target.as_str());
        let _ = writeln!(
            page,
            "<tr><td><a href=\"/{name}\">{name}</a></td><td>{target}</td><td>{hits}</td>\
             <td><button onclick=\"fetch('/{name}', {{method: 'DELETE'}}).then(() => location.reload())\">Delete</button></td></tr>",
            hits = link.hits,
        );
    }
    page.push_str("</table>\n");
    let _ = writeln!(
        page,
        "<form method=\"post\" action=\"/_admin\">\n\
         <input type=\"hidden\" name=\"user\" value=\"{user}\">\n\
         <label>Name <input name=\"name\"></label>\n\
         <label>URL <input name=\"url\"></label>\n\
         <button type=\"submit\">Add</button>\n\
         </form>"
    );
    page.push_str("</body>\n</html>\n");
    page
}
