//! Item content rewriting, built on streaming `lol_html` handlers.
//!
//! Every item's HTML goes through exactly one rewrite pass; the configured
//! steps (scrape extraction, element removal, image URL rewriting) compose
//! into that pass together with the always-on sanitizer: doctype and
//! comments dropped, `<link>/<script>/<style>/<noscript>` and `[hidden]`
//! elements removed, `on*` event attributes and `class` stripped everywhere.

use std::borrow::Cow;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use lol_html::html_content::Element;
use lol_html::{
    doc_comments, doctype, element, rewrite_str, text, ElementContentHandlers,
    RewriteStrSettings, Selector,
};
use moka::sync::Cache;
use url::Url;

use crate::app::{FreshetError, Result};
use crate::domain::RewriteImageUrl;
use crate::pipeline::url_rewrite;

/// Selectors parsed at most once; bounded so a churn of one-off selectors
/// can't grow without limit.
const SELECTOR_CACHE_SIZE: u64 = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlOptions<'a> {
    /// Keep only subtrees matching this selector, dropping everything
    /// around them.
    pub scrape: Option<&'a str>,
    /// Remove elements matching this selector.
    pub remove: Option<&'a str>,
    pub image: Option<&'a RewriteImageUrl>,
    /// Base for resolving relative image URLs (home page, else feed URL).
    pub base: Option<&'a Url>,
}

pub struct ContentRewriter {
    selectors: Cache<String, Arc<Selector>>,
}

impl ContentRewriter {
    pub fn new() -> Self {
        Self {
            selectors: Cache::new(SELECTOR_CACHE_SIZE),
        }
    }

    fn selector(&self, raw: &str) -> Result<Arc<Selector>> {
        if let Some(selector) = self.selectors.get(raw) {
            return Ok(selector);
        }
        let selector: Selector = raw
            .parse()
            .map_err(|e| FreshetError::Transform(format!("invalid selector {raw:?}: {e}")))?;
        let selector = Arc::new(selector);
        self.selectors.insert(raw.to_string(), selector.clone());
        Ok(selector)
    }

    /// Run the single composed rewrite pass.
    pub fn rewrite(&self, html: &str, options: &HtmlOptions<'_>) -> Result<String> {
        let scrape = options.scrape.map(|raw| self.selector(raw)).transpose()?;
        let remove = options.remove.map(|raw| self.selector(raw)).transpose()?;
        let image = options
            .image
            .map(|config| {
                let name = config.name.as_deref().unwrap_or("src");
                if !is_valid_attribute_name(name) {
                    return Err(FreshetError::Transform(format!(
                        "invalid attribute name {name:?}"
                    )));
                }
                Ok((self.selector(&format!("img[{name}]"))?, name, config))
            })
            .transpose()?;

        let mut handlers: Vec<(Cow<'_, Selector>, ElementContentHandlers<'_>)> = Vec::new();

        for tag in ["link", "script", "style", "noscript", "[hidden]"] {
            handlers.push(element!(tag, |el| {
                el.remove();
                Ok(())
            }));
        }

        // Depth-tracked extraction: matched subtrees are kept verbatim,
        // elements outside any match are unwrapped, text outside any match
        // is dropped.
        if let Some(selector) = &scrape {
            let depth = Rc::new(Cell::new(0u32));

            let enter = depth.clone();
            handlers.push((
                Cow::Borrowed(selector.as_ref()),
                ElementContentHandlers::default().element(move |el| {
                    enter.set(enter.get() + 1);
                    let leave = enter.clone();
                    match el.end_tag_handlers() {
                        Some(handlers) => handlers.push(Box::new(move |_| {
                            leave.set(leave.get().saturating_sub(1));
                            Ok(())
                        })),
                        // Void element; there is no end tag to wait for.
                        None => enter.set(enter.get().saturating_sub(1)),
                    }
                    Ok(())
                }),
            ));

            let unwrap_depth = depth.clone();
            handlers.push(element!("*", move |el| {
                if unwrap_depth.get() == 0 && !el.removed() {
                    el.remove_and_keep_content();
                }
                Ok(())
            }));

            let text_depth = depth;
            handlers.push(text!("*", move |chunk| {
                if text_depth.get() == 0 {
                    chunk.remove();
                }
                Ok(())
            }));
        }

        if let Some(selector) = &remove {
            handlers.push((
                Cow::Borrowed(selector.as_ref()),
                ElementContentHandlers::default().element(|el| {
                    el.remove();
                    Ok(())
                }),
            ));
        }

        if let Some((selector, name, config)) = &image {
            let base = options.base.cloned();
            let name = name.to_string();
            let replacement = config.replacement.clone();
            handlers.push((
                Cow::Borrowed(selector.as_ref()),
                ElementContentHandlers::default().element(move |el| {
                    rewrite_image(el, &name, replacement.as_deref(), base.as_ref())
                }),
            ));
        }

        handlers.push(element!("*", |el| {
            if !el.removed() {
                strip_attributes(el);
            }
            Ok(())
        }));

        rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: handlers,
                document_content_handlers: vec![
                    doctype!(|doctype| {
                        doctype.remove();
                        Ok(())
                    }),
                    doc_comments!(|comment| {
                        comment.remove();
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|e| FreshetError::Transform(format!("HTML rewrite failed: {e}")))
    }
}

impl Default for ContentRewriter {
    fn default() -> Self {
        Self::new()
    }
}

fn rewrite_image(
    el: &mut Element,
    name: &str,
    replacement: Option<&str>,
    base: Option<&Url>,
) -> lol_html::HandlerResult {
    if el.removed() {
        return Ok(());
    }
    let Some(raw) = el.get_attribute(name) else {
        return Ok(());
    };
    let raw = html_escape::decode_html_entities(&raw);

    let resolved = match base {
        Some(base) => base.join(&raw),
        None => Url::parse(&raw),
    }
    .map_err(|e| FreshetError::Transform(format!("unresolvable image URL {raw:?}: {e}")))?;

    let value = match replacement {
        Some(template) => url_rewrite::url_replace(&resolved, template)?,
        None => resolved.to_string(),
    };

    if name != "src" {
        el.remove_attribute(name);
    }
    el.set_attribute("src", &value)?;
    Ok(())
}

fn strip_attributes(el: &mut Element) {
    let doomed: Vec<String> = el
        .attributes()
        .iter()
        .map(|attr| attr.name())
        .filter(|name| name.starts_with("on") || name == "class")
        .collect();
    for name in doomed {
        el.remove_attribute(&name);
    }
}

fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| matches!(c, ' ' | '\n' | '\r' | '\t' | '\x0c' | '/' | '>' | '='))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(html: &str, options: &HtmlOptions<'_>) -> String {
        ContentRewriter::new().rewrite(html, options).unwrap()
    }

    #[test]
    fn test_sanitize_strips_scripts_and_handlers() {
        let out = rewrite(
            r#"<!-- tracking --><p class="lead" onclick="evil()" id="p1">Hi<script>evil()</script></p><style>p{}</style>"#,
            &HtmlOptions::default(),
        );
        assert_eq!(out, r#"<p id="p1">Hi</p>"#);
    }

    #[test]
    fn test_sanitize_strips_hidden_and_noscript() {
        let out = rewrite(
            r#"<div hidden>secret</div><noscript>enable js</noscript><p>kept</p>"#,
            &HtmlOptions::default(),
        );
        assert_eq!(out, "<p>kept</p>");
    }

    #[test]
    fn test_scrape_extracts_exact_subtree() {
        let page = "<!DOCTYPE html><html><head><title>Page</title>\
                    <link rel=\"stylesheet\" href=\"a.css\"></head>\
                    <body><nav>menu</nav>\
                    <article><h1>Post</h1><p>Body <em>text</em></p></article>\
                    <footer>foot</footer></body></html>";
        let out = rewrite(
            page,
            &HtmlOptions {
                scrape: Some("body>article"),
                ..Default::default()
            },
        );
        assert_eq!(out, "<article><h1>Post</h1><p>Body <em>text</em></p></article>");
    }

    #[test]
    fn test_scrape_drops_text_outside_match() {
        let out = rewrite(
            "<body>stray <section><p>kept</p></section> tail</body>",
            &HtmlOptions {
                scrape: Some("section"),
                ..Default::default()
            },
        );
        assert_eq!(out, "<section><p>kept</p></section>");
    }

    #[test]
    fn test_scrape_keeps_multiple_matches() {
        let out = rewrite(
            "<div><p class=\"a\">one</p><span>skip</span><p>two</p></div>",
            &HtmlOptions {
                scrape: Some("p"),
                ..Default::default()
            },
        );
        assert_eq!(out, "<p>one</p><p>two</p>");
    }

    #[test]
    fn test_scrape_keeps_void_elements_inside_match() {
        let out = rewrite(
            "<body><p>skip</p><article>pic <img src=\"a.png\"> end</article><p>tail</p></body>",
            &HtmlOptions {
                scrape: Some("article"),
                ..Default::default()
            },
        );
        assert_eq!(out, r#"<article>pic <img src="a.png"> end</article>"#);
    }

    #[test]
    fn test_remove_selector() {
        let out = rewrite(
            r#"<div><aside id="ads">buy</aside><p>content</p></div>"#,
            &HtmlOptions {
                remove: Some("#ads"),
                ..Default::default()
            },
        );
        assert_eq!(out, "<div><p>content</p></div>");
    }

    #[test]
    fn test_image_resolves_relative_src() {
        let base = Url::parse("https://blog.example.com/").unwrap();
        let image = RewriteImageUrl::default();
        let out = rewrite(
            r#"<img src="images/cat.png">"#,
            &HtmlOptions {
                image: Some(&image),
                base: Some(&base),
                ..Default::default()
            },
        );
        assert_eq!(
            out,
            r#"<img src="https://blog.example.com/images/cat.png">"#
        );
    }

    #[test]
    fn test_image_custom_attribute_replaces_src() {
        let base = Url::parse("https://blog.example.com/").unwrap();
        let image = RewriteImageUrl {
            name: Some("data-src".into()),
            replacement: None,
        };
        let out = rewrite(
            r#"<img data-src="/cat.png" src="placeholder.gif">"#,
            &HtmlOptions {
                image: Some(&image),
                base: Some(&base),
                ..Default::default()
            },
        );
        assert!(!out.contains("data-src"));
        assert!(out.contains(r#"src="https://blog.example.com/cat.png""#));
    }

    #[test]
    fn test_image_replacement_template() {
        let base = Url::parse("https://blog.example.com/").unwrap();
        let image = RewriteImageUrl {
            name: None,
            replacement: Some("https://cdn.example$<pathname>".into()),
        };
        let out = rewrite(
            r#"<img src="/img/cat.png">"#,
            &HtmlOptions {
                image: Some(&image),
                base: Some(&base),
                ..Default::default()
            },
        );
        assert_eq!(out, r#"<img src="https://cdn.example/img/cat.png">"#);
    }

    #[test]
    fn test_invalid_selector_is_transform_error() {
        let err = ContentRewriter::new()
            .rewrite(
                "<p>x</p>",
                &HtmlOptions {
                    remove: Some("p[[["),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, FreshetError::Transform(_)));
    }

    #[test]
    fn test_selector_cache_reuse() {
        let rewriter = ContentRewriter::new();
        let options = HtmlOptions {
            remove: Some("aside"),
            ..Default::default()
        };
        rewriter.rewrite("<aside>a</aside><p>x</p>", &options).unwrap();
        let out = rewriter.rewrite("<aside>b</aside><p>y</p>", &options).unwrap();
        assert_eq!(out, "<p>y</p>");
    }
}
