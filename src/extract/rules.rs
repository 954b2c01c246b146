// src/extract/rules.rs
//! Container rules: which element holds an article's readable body.
//!
//! Rules are plain data and are tried in order; the first rule that matches any
//! element wins, and within a rule the first match in document order wins. New site
//! templates are supported by appending a rule, not by adding branches.

use scraper::ElementRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRule {
    pub tags: Vec<String>,
    pub classes: Vec<String>,
}

impl ContainerRule {
    pub fn new(tags: &[&str], classes: &[&str]) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_ascii_lowercase()).collect(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Tag in the tag set and at least one class token in the allow-list.
    pub fn matches(&self, el: &ElementRef<'_>) -> bool {
        let value = el.value();
        let tag = value.name();
        if !self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return false;
        }
        value
            .classes()
            .any(|c| self.classes.iter().any(|allowed| allowed.eq_ignore_ascii_case(c)))
    }
}

/// Common publishing templates: news CMSs first, then blog engines, then generic wrappers.
pub fn default_rules() -> Vec<ContainerRule> {
    vec![
        ContainerRule::new(
            &["article", "div", "section", "main"],
            &["article-body", "article-content", "article__body", "story-body"],
        ),
        ContainerRule::new(
            &["article", "div", "section", "main"],
            &["entry-content", "post-content", "post-body"],
        ),
        ContainerRule::new(&["main", "article", "div"], &["main-content", "content-body"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        let sel = Selector::parse(css).unwrap();
        doc.select(&sel).next().unwrap()
    }

    #[test]
    fn tag_and_class_must_both_match() {
        let rule = ContainerRule::new(&["article"], &["entry-content"]);
        let doc = Html::parse_fragment(
            r#"<article class="x Entry-Content"></article><div class="entry-content"></div>"#,
        );
        assert!(rule.matches(&first(&doc, "article")));
        assert!(!rule.matches(&first(&doc, "div")));
    }

    #[test]
    fn class_prefix_is_not_a_match() {
        let rule = ContainerRule::new(&["div"], &["post-content"]);
        let doc = Html::parse_fragment(r#"<div class="post-content-sidebar"></div>"#);
        assert!(!rule.matches(&first(&doc, "div")));
    }
}
