//! Built-in portfolio views. Deliberately plain: they exist so the runtime can
//! render something end to end, not as a templating system.

use super::html::{escape, text};
use super::renderable::Renderable;
use crate::app::errors::{AppError, AppResult};
use serde_json::Value;

/// Headline block: `{name, title, summary}`
pub struct HeroView;

impl Renderable for HeroView {
    fn render(&self, data: &Value) -> AppResult<String> {
        if !data.is_object() {
            return Err(AppError::render("hero", "expected an object with a name"));
        }
        Ok(format!(
            "<section class=\"hero\"><h1>{}</h1><h2>{}</h2><p>{}</p></section>",
            text(data, "name"),
            text(data, "title"),
            text(data, "summary")
        ))
    }
}

/// Navigation bar: `{items: [{path, label}], active}`
pub struct NavigationView;

impl Renderable for NavigationView {
    fn render(&self, data: &Value) -> AppResult<String> {
        let items = data
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| AppError::render("navigation", "missing navigation items"))?;
        let active = data.get("active").and_then(Value::as_str);

        let mut out = String::from("<nav class=\"site-nav\"><ul>");
        for item in items {
            let path = item.get("path").and_then(Value::as_str).unwrap_or("/");
            let current = if Some(path) == active {
                " class=\"active\" aria-current=\"page\""
            } else {
                ""
            };
            out.push_str(&format!(
                "<li{}><a href=\"{}\">{}</a></li>",
                current,
                escape(path),
                text(item, "label")
            ));
        }
        out.push_str("</ul></nav>");
        Ok(out)
    }
}

/// Content section: `{id, title, body, items: [string]}`
pub struct SectionView;

impl Renderable for SectionView {
    fn render(&self, data: &Value) -> AppResult<String> {
        let id = data
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::render("section", "section without an id"))?;

        let mut out = format!(
            "<section id=\"{}\" class=\"content-section\"><h2>{}</h2>",
            escape(id),
            text(data, "title")
        );
        let body = text(data, "body");
        if !body.is_empty() {
            out.push_str(&format!("<p>{body}</p>"));
        }
        if let Some(items) = data.get("items").and_then(Value::as_array) {
            out.push_str("<ul>");
            for item in items.iter().filter_map(Value::as_str) {
                out.push_str(&format!("<li>{}</li>", escape(item)));
            }
            out.push_str("</ul>");
        }
        out.push_str("</section>");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hero_should_render_escaped_fields() {
        let html = HeroView
            .render(&json!({"name": "Ada <L>", "title": "Engineer"}))
            .unwrap();
        assert!(html.contains("<h1>Ada &lt;L&gt;</h1>"));
        assert!(html.contains("<h2>Engineer</h2>"));
    }

    #[test]
    fn hero_should_reject_non_object_input() {
        assert!(HeroView.render(&Value::Null).is_err());
    }

    #[test]
    fn navigation_should_mark_active_item() {
        let html = NavigationView
            .render(&json!({
                "items": [
                    {"path": "/", "label": "Home"},
                    {"path": "/about", "label": "About"}
                ],
                "active": "/about"
            }))
            .unwrap();
        assert!(html.contains("<li><a href=\"/\">Home</a></li>"));
        assert!(html
            .contains("<li class=\"active\" aria-current=\"page\"><a href=\"/about\">About</a></li>"));
    }

    #[test]
    fn section_should_render_items_and_require_id() {
        let html = SectionView
            .render(&json!({"id": "skills", "title": "Skills", "items": ["Rust", "SQL"]}))
            .unwrap();
        assert!(html.contains("id=\"skills\""));
        assert!(html.contains("<li>Rust</li><li>SQL</li>"));
        assert!(!html.contains("<p>"));

        assert!(SectionView.render(&json!({"title": "No id"})).is_err());
    }
}
