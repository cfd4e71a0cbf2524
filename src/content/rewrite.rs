//! Relative URL rebasing for injected fragments
//!
//! A fragment is written relative to its own file but rendered inside the
//! reader page, so relative `src`/`href` values must be prefixed with the
//! chapter's directory.

use lol_html::{element, rewrite_str, RewriteStrSettings};

use super::ContentError;

const ABSOLUTE_PREFIXES: [&str; 6] = ["http://", "https://", "/", "#", "mailto:", "data:"];

/// Directory part of `chapter_url` including the trailing slash, or `""` for
/// a bare file name
pub fn chapter_base_dir(chapter_url: &str) -> &str {
    match chapter_url.rfind('/') {
        Some(pos) => &chapter_url[..=pos],
        None => "",
    }
}

/// Whether `url` should be resolved against the chapter directory
pub fn is_relative_url(url: &str) -> bool {
    !url.is_empty() && !ABSOLUTE_PREFIXES.iter().any(|p| url.starts_with(p))
}

fn rebase(base: &str, value: Option<String>) -> Option<String> {
    value
        .filter(|v| is_relative_url(v))
        .map(|v| format!("{}{}", base, v))
}

/// Prefix every relative `src` and `href` in `html` with the directory of
/// `chapter_url`
pub fn rewrite_relative_urls(html: &str, chapter_url: &str) -> Result<String, ContentError> {
    let base = chapter_base_dir(chapter_url);
    if base.is_empty() {
        return Ok(html.to_string());
    }

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("[src]", |el| {
                    if let Some(rebased) = rebase(base, el.get_attribute("src")) {
                        el.set_attribute("src", &rebased)?;
                    }
                    Ok(())
                }),
                element!("[href]", |el| {
                    if let Some(rebased) = rebase(base, el.get_attribute("href")) {
                        el.set_attribute("href", &rebased)?;
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| ContentError::Rewrite(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTER: &str = "build/content/fa/cardio/heart_failure.html";

    #[test]
    fn test_chapter_base_dir() {
        assert_eq!(chapter_base_dir(CHAPTER), "build/content/fa/cardio/");
        assert_eq!(chapter_base_dir("loose.html"), "");
    }

    #[test]
    fn test_rewrite_relative_src_and_href() {
        let html = r#"<p><img src="fig1.png"><a href="notes.html#x">n</a></p>"#;
        let result = rewrite_relative_urls(html, CHAPTER).unwrap();

        assert!(result.contains(r#"src="build/content/fa/cardio/fig1.png""#));
        assert!(result.contains(r#"href="build/content/fa/cardio/notes.html#x""#));
    }

    #[test]
    fn test_rewrite_preserves_absolute_urls() {
        let html = concat!(
            r#"<img src="build/media/x.png">"#,
            r#"<img src="/abs.png">"#,
            r##"<a href="#top">t</a>"##,
            r#"<a href="https://example.com">e</a>"#,
            r#"<a href="mailto:a@b.c">m</a>"#,
            r#"<img src="data:image/png;base64,AAAA">"#,
        );
        let result = rewrite_relative_urls(html, CHAPTER).unwrap();

        assert!(result.contains(r#"src="build/content/fa/cardio/build/media/x.png""#));
        assert!(result.contains(r#"src="/abs.png""#));
        assert!(result.contains(r##"href="#top""##));
        assert!(result.contains(r#"href="https://example.com""#));
        assert!(result.contains(r#"href="mailto:a@b.c""#));
        assert!(result.contains(r#"src="data:image/png;base64,AAAA""#));
    }

    #[test]
    fn test_rewrite_ignores_empty_values() {
        let html = r#"<a href="">x</a>"#;
        assert_eq!(rewrite_relative_urls(html, CHAPTER).unwrap(), html);
    }

    #[test]
    fn test_bare_chapter_url_leaves_html_alone() {
        let html = r#"<img src="a.png">"#;
        assert_eq!(rewrite_relative_urls(html, "ch.html").unwrap(), html);
    }
}
