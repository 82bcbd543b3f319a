//! Small HTML helpers shared by the built-in views and the fallback panels.

use serde_json::Value;

/// Escape text for use in element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// String field of a JSON object, escaped; empty when absent
pub fn text(data: &Value, field: &str) -> String {
    data.get(field)
        .and_then(Value::as_str)
        .map(escape)
        .unwrap_or_default()
}

/// Inline panel shown in place of a view that failed to render
pub fn fallback_panel(view: &str, message: &str) -> String {
    format!(
        "<div class=\"render-fallback\" data-view=\"{}\" role=\"alert\"><p>This section could not be displayed.</p><pre>{}</pre></div>",
        escape(view),
        escape(message)
    )
}

/// Full-page fallback shown when the bootstrap ends in ERROR
pub fn error_page(detail: &str) -> String {
    format!(
        "<main class=\"app-error\" role=\"alert\"><h1>Something went wrong</h1><p>The application could not start.</p><pre class=\"app-error-detail\">{}</pre><button type=\"button\" data-action=\"reload\">Reload</button></main>",
        escape(detail)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escape_should_neutralize_markup() {
        assert_eq!(
            escape("<a href=\"x\">Tom & 'Jerry'</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn text_should_default_to_empty() {
        let data = json!({"name": "<b>A</b>", "age": 3});
        assert_eq!(text(&data, "name"), "&lt;b&gt;A&lt;/b&gt;");
        assert_eq!(text(&data, "age"), "");
        assert_eq!(text(&data, "missing"), "");
    }

    #[test]
    fn error_page_should_offer_reload_action() {
        let page = error_page("router timed out");
        assert!(page.contains("data-action=\"reload\""));
        assert!(page.contains("router timed out"));
    }
}
