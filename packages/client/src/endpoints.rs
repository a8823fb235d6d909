//! Repository REST endpoint URLs.

use weblounge_editor::PageQuery;

/// URL builder rooted at the repository API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    root: String,
}

impl Endpoints {
    pub fn new(base_url: &str, endpoint: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let endpoint = endpoint.trim_matches('/');
        let root = if endpoint.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{endpoint}")
        };
        Self { root }
    }

    pub fn pages(&self) -> String {
        format!("{}/pages", self.root)
    }

    pub fn page(&self, id: &str) -> String {
        format!("{}/pages/{id}", self.root)
    }

    pub fn page_lock(&self, id: &str) -> String {
        format!("{}/lock", self.page(id))
    }

    pub fn page_publish(&self, id: &str) -> String {
        format!("{}/publish", self.page(id))
    }

    pub fn page_referrers(&self, id: &str) -> String {
        format!("{}/referrer", self.page(id))
    }

    pub fn pending_pages(&self) -> String {
        format!("{}/pages/pending", self.root)
    }

    pub fn files(&self) -> String {
        format!("{}/files", self.root)
    }

    pub fn file(&self, id: &str) -> String {
        format!("{}/files/{id}", self.root)
    }

    pub fn file_content(&self, id: &str, language: &str) -> String {
        format!("{}/content/{language}", self.file(id))
    }
}

/// Query string of a page listing
pub fn query_params(query: &PageQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("sort", query.sort.as_str().to_string()),
        ("limit", query.limit.to_string()),
        ("offset", query.offset.to_string()),
    ];
    if let Some(version) = query.version {
        params.push(("version", version.index().to_string()));
    }
    if let Some(version) = query.preferred_version {
        params.push(("preferredversion", version.index().to_string()));
    }
    if let Some(filter) = &query.filter {
        params.push(("filter", filter.clone()));
    }
    if let Some(terms) = &query.search_terms {
        params.push(("searchterms", terms.clone()));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use weblounge_common::ResourceVersion;

    #[test]
    fn test_join_base_and_endpoint() {
        let endpoints = Endpoints::new("http://localhost:8080/", "/system/weblounge/");
        assert_eq!(endpoints.page("home"), "http://localhost:8080/system/weblounge/pages/home");
        assert_eq!(
            endpoints.page_lock("home"),
            "http://localhost:8080/system/weblounge/pages/home/lock"
        );
        assert_eq!(
            endpoints.file_content("logo", "de"),
            "http://localhost:8080/system/weblounge/files/logo/content/de"
        );

        let bare = Endpoints::new("http://cms", "");
        assert_eq!(bare.pending_pages(), "http://cms/pages/pending");
    }

    #[test]
    fn test_query_params() {
        let params = query_params(
            &PageQuery::search("news")
                .with_version(ResourceVersion::Work)
                .with_filter("type:page"),
        );
        assert!(params.contains(&("sort", "modified-desc".to_string())));
        assert!(params.contains(&("limit", "8".to_string())));
        assert!(params.contains(&("version", ResourceVersion::Work.index().to_string())));
        assert!(params.contains(&("searchterms", "news".to_string())));
        assert!(params.contains(&("filter", "type:page".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "preferredversion"));
    }
}
