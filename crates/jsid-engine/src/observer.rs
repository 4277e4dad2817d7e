//! Turns raw page mutations and network requests into [`ChangeRecord`]s.
//!
//! Most of what a page does after a click is noise for a generated test:
//! spinners, images, analytics beacons, elements without a stable handle.
//! The filter keeps the effects a test can assert on.

use jsid_common::change::{ChangeRecord, DomChangeKind};
use jsid_common::protocol::{ElementSnapshot, RawMutation, RawRequest};
use jsid_common::selector::generate_selector;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Tags whose mutations are never reported.
pub const IGNORED_TAGS: &[&str] = &[
    "script",
    "style",
    "link",
    "meta",
    "noscript",
    "iframe",
    "time",
    "hr",
    "br",
    "svg",
    "path",
    "g",
    "circle",
    "rect",
    "line",
    "polygon",
    "polyline",
    "img",
    "source",
    "picture",
    "canvas",
    "slot",
    "faceplate-loader",
    "faceplate-partial",
    "shreddit-loading",
    "ac-track",
];

const STATIC_ASSET_SUFFIXES: &[&str] = &[
    ".js", ".css", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".woff", ".woff2", ".ttf",
];

const NON_API_FRAGMENTS: &[&str] = &[
    ".js",
    ".css",
    ".png",
    ".jpg",
    ".jpeg",
    ".gif",
    ".svg",
    ".ico",
    ".woff",
    ".woff2",
    ".ttf",
    ".eot",
    ".map",
    ".webp",
    ".avif",
    ".mp4",
    ".webm",
    "/static/",
    "/assets/",
    "/images/",
    "/fonts/",
    // tracking and analytics
    "google.com",
    "facebook.com",
    "twitter.com",
    "analytics",
    "recaptcha",
    "captcha",
    "tracking",
    "beacon",
    // media CDNs and background traffic of large sites
    "preview.redd.it",
    "external-preview.redd.it",
    "styles.redditmedia.com",
    "www.redditstatic.com",
    "emoji.redditmedia.com",
    "w3-reporting.reddit.com",
    "alb.reddit.com",
    "/svc/shreddit/events",
    "/svc/shreddit/trending",
    "/svc/shreddit/graphql",
];

const API_FRAGMENTS: &[&str] = &["/api/", "search", "httpbin.org"];

const API_PATH_FRAGMENTS: &[&str] = &["/json", "/get", "/post", "/data", "/query"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverConfig {
    /// Fixed delay before a drain, letting asynchronous effects land.
    pub settle_timeout: Duration,
    /// Drop changes on elements that only have a class or tag selector.
    pub only_stable_selectors: bool,
    /// Cap on DOM and CSS changes per drain. Network changes are not capped.
    pub max_changes_per_action: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            settle_timeout: Duration::from_millis(500),
            only_stable_selectors: true,
            max_changes_per_action: 10,
        }
    }
}

/// True for requests that fetch a static asset; those are not buffered.
pub fn is_static_asset(url: &str) -> bool {
    STATIC_ASSET_SUFFIXES.iter().any(|ext| url.ends_with(ext))
}

/// Heuristic: does this URL look like a user-triggered API call?
pub fn is_api_request(url: &str) -> bool {
    let lower = url.to_lowercase();

    if NON_API_FRAGMENTS.iter().any(|p| lower.contains(p)) {
        return false;
    }

    API_FRAGMENTS.iter().any(|p| lower.contains(p))
        || API_PATH_FRAGMENTS.iter().any(|p| lower.contains(p))
}

/// Reduce a request URL to the part a test should match on: the query is
/// dropped and `/api/` URLs keep only their `/api/...` path.
pub fn extract_api_pattern(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or(url);
    match without_query.split_once("/api/") {
        Some((_, rest)) => format!("/api/{}", rest),
        None => without_query.to_string(),
    }
}

/// Value of `property` in an inline style string, or an empty string.
pub fn extract_css_property(style: &str, property: &str) -> String {
    style
        .split(';')
        .filter_map(|part| part.split_once(':'))
        .find(|(name, _)| name.trim() == property)
        .map(|(_, value)| value.trim().to_string())
        .unwrap_or_default()
}

fn is_ignored(element: &ElementSnapshot) -> bool {
    let tag = element.tag.to_lowercase();
    IGNORED_TAGS.contains(&tag.as_str())
}

pub struct ChangeFilter {
    config: ObserverConfig,
    seen_selectors: HashSet<String>,
    seen_api_patterns: HashSet<String>,
}

impl ChangeFilter {
    pub fn new(config: ObserverConfig) -> Self {
        info!(
            "ChangeFilter initialized with settle_timeout={}ms, only_stable_selectors={}, max_changes_per_action={}",
            config.settle_timeout.as_millis(),
            config.only_stable_selectors,
            config.max_changes_per_action
        );
        Self {
            config,
            seen_selectors: HashSet::new(),
            seen_api_patterns: HashSet::new(),
        }
    }

    /// Forget DOM/CSS selectors seen so far. API patterns stay deduplicated
    /// for the lifetime of the filter.
    pub fn reset(&mut self) {
        self.seen_selectors.clear();
    }

    pub fn process(
        &mut self,
        mutations: Vec<RawMutation>,
        requests: Vec<RawRequest>,
    ) -> Vec<ChangeRecord> {
        let raw_count = mutations.len();
        let mut changes: Vec<ChangeRecord> = mutations
            .into_iter()
            .filter_map(|mutation| self.process_mutation(mutation))
            .collect();

        if changes.len() > self.config.max_changes_per_action {
            info!(
                "Limiting DOM/CSS changes from {} to {}",
                changes.len(),
                self.config.max_changes_per_action
            );
            changes.truncate(self.config.max_changes_per_action);
        }
        let page_changes = changes.len();

        for request in requests {
            if !is_api_request(&request.url) {
                continue;
            }
            let pattern = extract_api_pattern(&request.url);
            let key = format!("{}:{}", request.method, pattern);
            if self.seen_api_patterns.insert(key) {
                info!("API request: {} {}", request.method, pattern);
                changes.push(ChangeRecord::network(request.method, pattern));
            }
        }

        info!(
            "Changes: {} DOM/CSS from {} raw mutations, {} API",
            page_changes,
            raw_count,
            changes.len() - page_changes
        );
        changes
    }

    fn process_mutation(&mut self, mutation: RawMutation) -> Option<ChangeRecord> {
        match mutation {
            RawMutation::ChildList { action, element } => {
                let selector = self.stable_selector(&element)?;
                if !self.seen_selectors.insert(selector.clone()) {
                    debug!("Duplicate DOM change on {}", selector);
                    return None;
                }
                info!("DOM change detected: {} {:?}", selector, action);
                Some(match action {
                    DomChangeKind::Added => ChangeRecord::added(selector),
                    DomChangeKind::Removed => ChangeRecord::removed(selector),
                })
            }
            RawMutation::Attributes {
                attribute,
                element,
                old_value,
                new_value,
            } => {
                if attribute.as_deref() != Some("style") {
                    return None;
                }
                let selector = self.stable_selector(&element)?;
                // Any style touch claims the selector, even without a display flip.
                if !self.seen_selectors.insert(selector.clone()) {
                    return None;
                }

                let current = extract_css_property(new_value.as_deref().unwrap_or(""), "display");
                let previous = extract_css_property(old_value.as_deref().unwrap_or(""), "display");
                if current == previous {
                    return None;
                }

                info!(
                    "CSS change detected: {} display: {:?} -> {:?}",
                    selector, previous, current
                );
                let value = if current.is_empty() {
                    "block".to_string()
                } else {
                    current
                };
                Some(ChangeRecord::css(selector, "display", value))
            }
        }
    }

    fn stable_selector(&self, element: &ElementSnapshot) -> Option<String> {
        if is_ignored(element) {
            return None;
        }
        let (selector, is_fragile) = generate_selector(element);
        if self.config.only_stable_selectors && is_fragile {
            debug!("Filtered change on fragile selector {}", selector);
            return None;
        }
        Some(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, id: &str) -> ElementSnapshot {
        ElementSnapshot {
            tag: tag.into(),
            id: id.into(),
            ..Default::default()
        }
    }

    fn added(tag: &str, id: &str) -> RawMutation {
        RawMutation::ChildList {
            action: DomChangeKind::Added,
            element: element(tag, id),
        }
    }

    fn style(id: &str, old: Option<&str>, new: Option<&str>) -> RawMutation {
        RawMutation::Attributes {
            attribute: Some("style".into()),
            element: element("div", id),
            old_value: old.map(String::from),
            new_value: new.map(String::from),
        }
    }

    fn request(method: &str, url: &str) -> RawRequest {
        RawRequest {
            method: method.into(),
            url: url.into(),
        }
    }

    #[test]
    fn test_api_request_heuristics() {
        assert!(is_api_request("https://shop.test/api/cart"));
        assert!(is_api_request("https://httpbin.org/anything"));
        assert!(is_api_request("https://shop.test/search?q=x"));
        assert!(is_api_request("https://shop.test/v2/query"));
        assert!(!is_api_request("https://shop.test/api/bundle.js"));
        assert!(!is_api_request("https://www.google.com/api/collect"));
        assert!(!is_api_request("https://shop.test/about"));
    }

    #[test]
    fn test_static_assets() {
        assert!(is_static_asset("https://cdn.test/app.js"));
        assert!(is_static_asset("https://cdn.test/font.woff2"));
        assert!(!is_static_asset("https://shop.test/api/items"));
    }

    #[test]
    fn test_api_pattern_extraction() {
        assert_eq!(
            extract_api_pattern("https://shop.test/api/items?page=2"),
            "/api/items"
        );
        assert_eq!(
            extract_api_pattern("https://httpbin.org/get?x=1"),
            "https://httpbin.org/get"
        );
    }

    #[test]
    fn test_css_property_extraction() {
        assert_eq!(extract_css_property("color: red; display : none", "display"), "none");
        assert_eq!(extract_css_property("color: red", "display"), "");
        assert_eq!(extract_css_property("", "display"), "");
    }

    #[test]
    fn test_dom_changes_filter_noise_and_duplicates() {
        let mut filter = ChangeFilter::new(ObserverConfig::default());
        let changes = filter.process(
            vec![
                added("div", "menu"),
                added("img", "logo"),
                added("div", ""),
                added("div", "menu"),
                RawMutation::ChildList {
                    action: DomChangeKind::Removed,
                    element: element("p", "hint"),
                },
            ],
            vec![],
        );
        assert_eq!(
            changes,
            vec![ChangeRecord::added("#menu"), ChangeRecord::removed("#hint")]
        );
    }

    #[test]
    fn test_fragile_selectors_kept_when_allowed() {
        let mut filter = ChangeFilter::new(ObserverConfig {
            only_stable_selectors: false,
            ..Default::default()
        });
        let changes = filter.process(vec![added("section", "")], vec![]);
        assert_eq!(changes, vec![ChangeRecord::added("section")]);
    }

    #[test]
    fn test_style_changes_report_display_only() {
        let mut filter = ChangeFilter::new(ObserverConfig::default());
        let changes = filter.process(
            vec![
                style("dropdown", Some("display: none"), Some("display: block")),
                style("panel", Some("color: red"), Some("color: blue")),
                style("toast", Some("display: none"), None),
                RawMutation::Attributes {
                    attribute: Some("class".into()),
                    element: element("div", "other"),
                    old_value: None,
                    new_value: Some("open".into()),
                },
            ],
            vec![],
        );
        assert_eq!(
            changes,
            vec![
                ChangeRecord::css("#dropdown", "display", "block"),
                ChangeRecord::css("#toast", "display", "block"),
            ]
        );
    }

    #[test]
    fn test_style_touch_without_display_flip_claims_selector() {
        let mut filter = ChangeFilter::new(ObserverConfig::default());
        let changes = filter.process(
            vec![
                style("panel", Some("color: red"), Some("color: blue")),
                added("div", "panel"),
                style("panel", Some("display: none"), Some("display: flex")),
            ],
            vec![],
        );
        assert!(changes.is_empty());

        filter.reset();
        let changes = filter.process(vec![added("div", "panel")], vec![]);
        assert_eq!(changes, vec![ChangeRecord::added("#panel")]);
    }

    #[test]
    fn test_page_changes_are_capped_but_network_is_not() {
        let mut filter = ChangeFilter::new(ObserverConfig {
            max_changes_per_action: 2,
            ..Default::default()
        });
        let mutations = (0..5).map(|i| added("li", &format!("item-{}", i))).collect();
        let changes = filter.process(
            mutations,
            vec![
                request("GET", "https://shop.test/api/items?page=1"),
                request("GET", "https://shop.test/api/items?page=2"),
                request("POST", "https://shop.test/api/items"),
                request("GET", "https://shop.test/logo.png"),
            ],
        );

        assert_eq!(changes.iter().filter(|c| c.is_page_change()).count(), 2);
        assert_eq!(
            &changes[2..],
            &[
                ChangeRecord::network("GET", "/api/items"),
                ChangeRecord::network("POST", "/api/items"),
            ]
        );
    }

    #[test]
    fn test_reset_forgets_selectors_but_not_api_patterns() {
        let mut filter = ChangeFilter::new(ObserverConfig::default());
        filter.process(
            vec![added("div", "menu")],
            vec![request("GET", "https://shop.test/api/me")],
        );
        filter.reset();
        let changes = filter.process(
            vec![added("div", "menu")],
            vec![request("GET", "https://shop.test/api/me")],
        );
        assert_eq!(changes, vec![ChangeRecord::added("#menu")]);
    }
}
