//! Per-page context handed to every function call

use std::sync::Arc;

use crate::config::TransformSettings;
use crate::html::RichTextTransformator;
use crate::source::{
    AssetPersistence, HtmlTransformator, IdentityUrlMapper, LookupCache, SiteUrlMapper,
    SourceContext, UrlMapper, UserMapper, UserMappingTable, WebInfo,
};

/// Everything a built-in function may consult while transforming one page.
///
/// Built once per page and shared read-only by the content units on it;
/// the lookup cache is the only interior-mutable part.
pub struct TransformationContext {
    source: Arc<dyn SourceContext>,
    target: Option<WebInfo>,
    url_mapper: Arc<dyn UrlMapper>,
    user_mapper: Arc<dyn UserMapper>,
    assets: Option<Arc<dyn AssetPersistence>>,
    html: Arc<dyn HtmlTransformator>,
    settings: TransformSettings,
    cache: LookupCache,
}

impl TransformationContext {
    /// Same-site context with identity mappers and no asset persistence
    pub fn new(source: Arc<dyn SourceContext>, settings: TransformSettings) -> Self {
        let cache = LookupCache::new(settings.cache_lookups);
        TransformationContext {
            source,
            target: None,
            url_mapper: Arc::new(IdentityUrlMapper),
            user_mapper: Arc::new(UserMappingTable::new()),
            assets: None,
            html: Arc::new(RichTextTransformator),
            settings,
            cache,
        }
    }

    /// Set the target web; links are rewritten with a [`SiteUrlMapper`]
    /// unless another mapper is installed afterwards
    pub fn with_target(mut self, target: WebInfo) -> Self {
        self.url_mapper = Arc::new(SiteUrlMapper::new(self.source.web(), &target));
        self.target = Some(target);
        self
    }

    pub fn with_url_mapper(mut self, mapper: Arc<dyn UrlMapper>) -> Self {
        self.url_mapper = mapper;
        self
    }

    pub fn with_user_mapper(mut self, mapper: Arc<dyn UserMapper>) -> Self {
        self.user_mapper = mapper;
        self
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetPersistence>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn with_html(mut self, html: Arc<dyn HtmlTransformator>) -> Self {
        self.html = html;
        self
    }

    pub fn source(&self) -> &dyn SourceContext {
        self.source.as_ref()
    }

    pub fn source_web(&self) -> &WebInfo {
        self.source.web()
    }

    pub fn target(&self) -> Option<&WebInfo> {
        self.target.as_ref()
    }

    /// Target web, or the source web for in-place transformations
    pub fn target_web(&self) -> &WebInfo {
        self.target.as_ref().unwrap_or_else(|| self.source.web())
    }

    /// Whether content moves to a different web
    pub fn is_cross_site(&self) -> bool {
        self.target.as_ref().is_some_and(|t| {
            !t.server_relative_url
                .eq_ignore_ascii_case(&self.source.web().server_relative_url)
                || !t.url.eq_ignore_ascii_case(&self.source.web().url)
        })
    }

    pub fn url_mapper(&self) -> &dyn UrlMapper {
        self.url_mapper.as_ref()
    }

    pub fn user_mapper(&self) -> &dyn UserMapper {
        self.user_mapper.as_ref()
    }

    pub fn assets(&self) -> Option<&dyn AssetPersistence> {
        self.assets.as_deref()
    }

    pub fn html(&self) -> &dyn HtmlTransformator {
        self.html.as_ref()
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }
}

impl std::fmt::Debug for TransformationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformationContext")
            .field("source", &self.source.web().url)
            .field("target", &self.target.as_ref().map(|t| &t.url))
            .field("has_assets", &self.assets.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}
