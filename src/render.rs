//! HTML for the single page and the reset-confirmation form.

use std::fmt::Write;

use crate::view::{Theme, ViewSnapshot};

const STYLE: &str = r#"
:root { --color-bg: #ffffff; --color-text: #1f2328; --color-primary: #6d28d9; --color-error: #d1242f; }
[data-theme="dark"] { --color-bg: #0d1117; --color-text: #e6edf3; --color-primary: #a78bfa; --color-error: #ff7b72; }
body { background: var(--color-bg); color: var(--color-text); font-family: system-ui, sans-serif; margin: 0; }
.app { max-width: 32rem; margin: 3rem auto; padding: 0 1rem; }
.theme-toggle { position: absolute; top: 10px; right: 10px; }
.error { color: var(--color-error); }
.info { color: green; }
.link-button { background: none; border: none; color: var(--color-primary); cursor: pointer; padding: 0; font-size: inherit; margin-left: 10px; }
"#;

/// Escape text for HTML element content and quoted attributes
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn document(theme: Theme, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\" data-theme=\"{theme}\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>SlayPoints</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        theme = theme.as_str(),
    )
}

fn messages(out: &mut String, error: Option<&str>, info: Option<&str>) {
    if let Some(error) = error {
        let _ = writeln!(out, "<p class=\"error\" role=\"alert\">{}</p>", escape_html(error));
    }
    if let Some(info) = info {
        let _ = writeln!(out, "<p class=\"info\" role=\"status\">{}</p>", escape_html(info));
    }
}

/// Render the main page for a view snapshot
pub fn render_page(view: &ViewSnapshot) -> String {
    let mut body = String::from("<div class=\"app\">\n");

    let _ = writeln!(
        body,
        "<form method=\"post\" action=\"/theme\"><button type=\"submit\" class=\"theme-toggle\">{}</button></form>",
        view.theme.toggle_label()
    );
    body.push_str("<h1>SlayPoints</h1>\n");
    messages(&mut body, view.error.as_deref(), view.info_message.as_deref());

    match &view.user {
        Some(user) => {
            let _ = writeln!(body, "<p>Welcome, {}!</p>", escape_html(&user.email));
            let _ = writeln!(
                body,
                "<p>Your Points: <span id=\"points\">{}</span></p>",
                view.points
            );
            let _ = writeln!(
                body,
                "<form method=\"post\" action=\"/adjust\">\n\
                 <input type=\"number\" name=\"amount\" value=\"{}\" placeholder=\"Enter points (+/-)\" aria-label=\"Points to adjust\">\n\
                 <button type=\"submit\">Adjust Points</button>\n</form>",
                escape_html(&view.pending_adjustment)
            );
            body.push_str("<hr>\n<form method=\"post\" action=\"/logout\"><button type=\"submit\">Logout</button></form>\n");
        }
        None => {
            body.push_str(
                "<h2>Login or Sign Up</h2>\n\
                 <form method=\"post\" action=\"/login\">\n\
                 <div><label>Email: <input type=\"email\" name=\"email\" required></label></div>\n\
                 <div><label>Password: <input type=\"password\" name=\"password\" required></label></div>\n\
                 <button type=\"submit\">Login</button>\n\
                 <button type=\"submit\" formaction=\"/signup\">Sign Up</button>\n\
                 <button type=\"submit\" formaction=\"/reset-password\" formnovalidate class=\"link-button\">Forgot Password?</button>\n\
                 </form>\n",
            );
        }
    }

    body.push_str("</div>\n");
    document(view.theme, &body)
}

/// Render the form that completes a password reset
pub fn render_reset_form(theme: Theme, token: &str) -> String {
    let mut body = String::from("<div class=\"app\">\n<h1>SlayPoints</h1>\n<h2>Choose a new password</h2>\n");
    let _ = writeln!(
        body,
        "<form method=\"post\" action=\"/reset-password/confirm\">\n\
         <input type=\"hidden\" name=\"token\" value=\"{}\">\n\
         <div><label>New password: <input type=\"password\" name=\"password\" required></label></div>\n\
         <button type=\"submit\">Set Password</button>\n</form>",
        escape_html(token)
    );
    body.push_str("</div>\n");
    document(theme, &body)
}
