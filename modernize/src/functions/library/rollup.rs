//! Content rollup and summary link transformations
//!
//! Query, search and summary link web parts become modern rollup web parts.
//! The result is split over four channels the page builder reassembles:
//! the serialized web part properties, searchable plain texts, links and
//! image sources.

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value, json};

use super::assets::transfer_asset;
use super::lists::lookup_list;
use super::param;
use crate::context::TransformationContext;
use crate::functions::coerce::{Args, INTEGER_FALLBACK, ParamType};
use crate::functions::definition::FunctionOutput;
use crate::functions::registry::{BuiltinFunction, FunctionDoc, FunctionKind, FunctionResult};

/// Items shown when the classic web part had no usable limit
const DEFAULT_ITEM_LIMIT: i32 = 15;
const DEFAULT_RESULTS_PER_PAGE: i32 = 3;

/// Page content type id prefix
const PAGE_CONTENT_TYPE: &str = "0x010100C568DB52D9D0A14D9B2FDCC96666E9F2007948130EC3DB064584E219954237AF39";

/// The four output channels of a rollup transformation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollupChannels {
    pub properties: Value,
    pub searchable_plain_texts: Map<String, Value>,
    pub links: Map<String, Value>,
    pub image_sources: Map<String, Value>,
}

impl RollupChannels {
    pub fn into_output(self) -> FunctionOutput {
        FunctionOutput::map([
            ("JsonProperties", self.properties.to_string()),
            ("SearchablePlainTexts", Value::Object(self.searchable_plain_texts).to_string()),
            ("Links", Value::Object(self.links).to_string()),
            ("ImageSources", Value::Object(self.image_sources).to_string()),
        ])
    }
}

fn map_link(ctx: &TransformationContext, url: &str) -> String {
    if ctx.settings().skip_url_rewrite {
        url.to_string()
    } else {
        ctx.url_mapper().map_url(url)
    }
}

fn positive_or(value: i32, default: i32) -> i32 {
    if value == INTEGER_FALLBACK || value <= 0 {
        default
    } else {
        value
    }
}

fn split_columns(columns: &str) -> Vec<String> {
    columns
        .split([';', ','])
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn content_type_filter(begins_with: &str) -> Option<&'static str> {
    let id = begins_with.trim().to_ascii_uppercase();
    if id.is_empty() {
        None
    } else if id.starts_with(&PAGE_CONTENT_TYPE.to_ascii_uppercase()) {
        Some("Page")
    } else if id.starts_with("0X0101") {
        Some("Document")
    } else if id.starts_with("0X0102") {
        Some("Event")
    } else if id.starts_with("0X0104") {
        Some("Announcement")
    } else if id.starts_with("0X0108") {
        Some("Task")
    } else {
        Some("Item")
    }
}

/// Where a query web part pulled its content from
fn content_location(ctx: &TransformationContext, web_url: &str, has_list: bool) -> &'static str {
    let web_url = web_url.trim().trim_end_matches('/');
    if has_list {
        "List"
    } else if web_url.is_empty() || web_url.eq_ignore_ascii_case(ctx.source_web().server_relative_url.trim_end_matches('/')) {
        "CurrentSite"
    } else if web_url.eq_ignore_ascii_case("~sitecollection") {
        "CurrentSiteCollection"
    } else {
        "SelectedSites"
    }
}

fn content_by_query(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let web_url = args.text(0);
    let list_id = args.guid(1);
    let list_name = args.text(2);
    let server_template = args.text(3);
    let sort_by = args.text(5);
    let descending = !args.text(6).trim().eq_ignore_ascii_case("asc");
    let item_limit = positive_or(args.integer(7), DEFAULT_ITEM_LIMIT);

    let mut channels = RollupChannels::default();
    let mut lists = Vec::new();
    if !list_id.is_nil() {
        let looked_up = lookup_list(ctx, list_id);
        let title = if list_name.trim().is_empty() {
            looked_up.as_ref().map(|l| l.title.clone()).unwrap_or_default()
        } else {
            list_name.trim().to_string()
        };
        let url = looked_up
            .as_ref()
            .map(|l| map_link(ctx, &l.server_relative_url))
            .unwrap_or_default();
        if !url.is_empty() {
            channels.links.insert("lists[0].url".into(), Value::String(url.clone()));
        }
        if !title.is_empty() {
            channels.searchable_plain_texts.insert("lists[0].title".into(), Value::String(title.clone()));
        }
        lists.push(json!({ "id": list_id.to_string(), "title": title, "url": url }));
    }

    let sort_type = match sort_by.trim().to_ascii_lowercase().as_str() {
        "" | "modified" | "created" => "MostRecent",
        "title" | "linkfilename" => "Alphabetical",
        _ => "Custom",
    };

    let content_types: Vec<&str> = content_type_filter(&args.text(4)).into_iter().collect();
    let sort_field = match sort_by.trim() {
        "" => "Modified",
        field => field,
    };
    let sort_direction = if descending { "desc" } else { "asc" };

    let mut query = json!({
        "contentLocation": content_location(ctx, &web_url, !lists.is_empty()),
        "contentTypes": content_types,
        "sortType": sort_type,
        "sortField": sort_field,
        "sortDirection": sort_direction,
        "filters": [],
        "queryMode": "Basic",
    });
    if let Ok(template) = server_template.trim().parse::<i32>() {
        query["listTemplate"] = json!(template);
    }

    channels.properties = json!({
        "query": query,
        "templateId": "List",
        "maxItemsPerPage": item_limit,
        "hideWebPartWhenEmpty": false,
        "displayColumns": split_columns(&args.text(8)),
        "lists": lists,
        "isMigrated": true,
    });
    Ok(channels.into_output())
}

fn template_for_render(render_template_id: &str) -> &'static str {
    let id = render_template_id.to_ascii_lowercase();
    if id.contains("slideshow") {
        "Carousel"
    } else if id.contains("control_list") {
        "List"
    } else {
        "Card"
    }
}

fn parse_json(raw: &str, what: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Could not read {} JSON: {}", what, e);
            Value::Null
        }
    }
}

fn content_by_search(_: &TransformationContext, args: &Args) -> FunctionResult {
    let provider = parse_json(&args.text(0), "data provider");
    let query_text = provider
        .get("QueryTemplate")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let source_id = provider.get("SourceID").and_then(Value::as_str).unwrap_or_default();

    let selected: Vec<String> = match parse_json(&args.text(1), "selected properties") {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    let mut query = json!({
        "contentLocation": "AllSites",
        "advancedQueryText": query_text,
        "queryMode": "Advanced",
    });
    if !source_id.is_empty() {
        query["resultSourceId"] = json!(source_id);
    }

    let mut channels = RollupChannels::default();
    if !query_text.is_empty() {
        channels
            .searchable_plain_texts
            .insert("query.advancedQueryText".into(), Value::String(query_text.clone()));
    }
    channels.properties = json!({
        "query": query,
        "templateId": template_for_render(&args.text(3)),
        "maxItemsPerPage": positive_or(args.integer(2), DEFAULT_RESULTS_PER_PAGE),
        "hideWebPartWhenEmpty": false,
        "displayColumns": selected,
        "isMigrated": true,
    });
    Ok(channels.into_output())
}

/// One entry of a classic summary link store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SummaryLink {
    pub title: String,
    pub description: String,
    pub url: String,
    pub image_url: String,
    pub image_alt: String,
    pub open_in_new_window: bool,
}

fn child_span<'a>(link: ElementRef<'a>, title: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(&format!(r#"span[title="{}"]"#, title)).ok()?;
    link.select(&selector).next()
}

fn span_text(link: ElementRef<'_>, title: &str) -> String {
    child_span(link, title)
        .map(|s| s.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Links of a summary link store; group headers carry no url and are skipped
pub(crate) fn summary_links(data: &str) -> Vec<SummaryLink> {
    if data.trim().is_empty() {
        return Vec::new();
    }
    let Ok(link_selector) = Selector::parse(r#"div[title="_link"]"#) else {
        return Vec::new();
    };
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let Ok(image) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    let fragment = Html::parse_fragment(data);
    fragment
        .select(&link_selector)
        .filter_map(|link| {
            let url = child_span(link, "_linkurl")
                .and_then(|s| s.select(&anchor).next())
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
                .unwrap_or_else(|| span_text(link, "_linkurl"));
            if url.is_empty() {
                return None;
            }
            let img = child_span(link, "_imageurl").and_then(|s| s.select(&image).next());
            Some(SummaryLink {
                title: span_text(link, "_title"),
                description: span_text(link, "_description"),
                url,
                image_url: img
                    .and_then(|i| i.value().attr("src"))
                    .unwrap_or_default()
                    .to_string(),
                image_alt: img
                    .and_then(|i| i.value().attr("alt"))
                    .unwrap_or_default()
                    .to_string(),
                open_in_new_window: span_text(link, "_openinnewwindow").eq_ignore_ascii_case("true"),
            })
        })
        .collect()
}

fn summary_links_to_quick_links(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let links = summary_links(&args.text(0));
    let mut properties = match parse_json(&args.text(1), "quick links") {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let mut channels = RollupChannels::default();
    let mut items = Vec::with_capacity(links.len());
    for (i, link) in links.iter().enumerate() {
        let url = map_link(ctx, &link.url);
        let mut item = json!({
            "id": i + 1,
            "title": link.title,
            "description": link.description,
            "sourceItem": { "url": url },
            "openInNewTab": link.open_in_new_window,
        });

        channels
            .searchable_plain_texts
            .insert(format!("items[{}].title", i), Value::String(link.title.clone()));
        if !link.description.is_empty() {
            channels
                .searchable_plain_texts
                .insert(format!("items[{}].description", i), Value::String(link.description.clone()));
        }
        channels
            .links
            .insert(format!("items[{}].sourceItem.url", i), Value::String(url));

        if !link.image_url.is_empty() {
            let image = transfer_asset(ctx, &link.image_url);
            item["altText"] = json!(link.image_alt);
            channels
                .image_sources
                .insert(format!("items[{}].rawPreviewImageUrl", i), Value::String(image));
        }
        items.push(item);
    }

    properties.insert("items".into(), Value::Array(items));
    properties.insert("isMigrated".into(), Value::Bool(true));
    channels.properties = Value::Object(properties);
    Ok(channels.into_output())
}

pub(super) const FUNCTIONS: &[BuiltinFunction] = &[
    BuiltinFunction {
        name: "ContentByQueryToHighlightedContentProperties",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Turns the configuration of a content by query web part into highlighted content web part properties.",
            example: "ContentByQueryToHighlightedContentProperties({WebUrl},{ListGuid},{ListName},{ServerTemplate},{ContentTypeBeginsWithId},{SortBy},{SortByDirection},{ItemLimit},{DisplayColumns})",
            params: &[
                param("webUrl", ParamType::String, "Web the query ran against"),
                param("listGuid", ParamType::Guid, "Queried list, if any"),
                param("listName", ParamType::String, "Title of the queried list"),
                param("serverTemplate", ParamType::String, "List template filter"),
                param("contentTypeBeginsWithId", ParamType::String, "Content type id filter"),
                param("sortBy", ParamType::String, "Sort field"),
                param("sortByDirection", ParamType::String, "Asc or Desc"),
                param("itemLimit", ParamType::Integer, "Number of items to show"),
                param("displayColumns", ParamType::String, "Semicolon separated fields to show"),
            ],
            returns: "JsonProperties, SearchablePlainTexts, Links and ImageSources",
        },
        handler: content_by_query,
    },
    BuiltinFunction {
        name: "ContentBySearchToHighlightedContentProperties",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Turns the configuration of a content search web part into highlighted content web part properties.",
            example: "ContentBySearchToHighlightedContentProperties({DataProviderJSON},{SelectedPropertiesJson},{ResultsPerPage},{RenderTemplateId})",
            params: &[
                param("dataProviderJson", ParamType::String, "Search data provider configuration"),
                param("selectedPropertiesJson", ParamType::String, "JSON array of shown managed properties"),
                param("resultsPerPage", ParamType::Integer, "Number of results to show"),
                param("renderTemplateId", ParamType::String, "Display template of the web part"),
            ],
            returns: "JsonProperties, SearchablePlainTexts, Links and ImageSources",
        },
        handler: content_by_search,
    },
    BuiltinFunction {
        name: "SummaryLinksToQuickLinksProperties",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Turns summary links into quick links web part properties. Link urls are rewritten and images transferred.",
            example: "SummaryLinksToQuickLinksProperties({SummaryLinkStore},{QuickLinksJsonProperties})",
            params: &[
                param("summaryLinkData", ParamType::String, "Summary link store html"),
                param("quickLinksJsonProperties", ParamType::String, "Base quick links properties as JSON"),
            ],
            returns: "JsonProperties, SearchablePlainTexts, Links and ImageSources",
        },
        handler: summary_links_to_quick_links,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformSettings;
    use crate::functions::coerce::Arg;
    use crate::source::{InMemorySource, ListBaseType, ListInfo, WebInfo};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use uuid::Uuid;

    const NEWS: &str = "55555555-5555-5555-5555-555555555555";

    const LINKS: &str = r#"<div title="_schemaversion" id="_3"><div title="_links">
        <div title="_link"><span title="_title">Policies</span><span title="_order">1</span><span title="_group">True</span></div>
        <div title="_link"><span title="_title">Handbook</span><span title="_description">All rules</span><span title="_linkurl"><a href="/sites/a/Pages/handbook.aspx">/sites/a/Pages/handbook.aspx</a></span><span title="_imageurl"><img alt="Book" src="/sites/a/SiteAssets/book.png" /></span><span title="_openinnewwindow">True</span></div>
        <div title="_link"><span title="_title">Contoso</span><span title="_linkurl"><a href="https://www.contoso.com">https://www.contoso.com</a></span></div>
    </div></div>"#;

    fn ctx() -> TransformationContext {
        let source = InMemorySource::new("https://contoso.sharepoint.com/sites/a").with_list(ListInfo {
            id: Uuid::parse_str(NEWS).unwrap(),
            title: "News".into(),
            base_type: ListBaseType::GenericList,
            base_template: 100,
            server_relative_url: "/sites/a/Lists/News".into(),
            views: vec![],
        });
        TransformationContext::new(Arc::new(source), TransformSettings::default())
            .with_target(WebInfo::new("https://contoso.sharepoint.com/sites/b"))
    }

    fn args(values: &[&str]) -> Args {
        Args::new(values.iter().map(|v| Arg::String(v.to_string())).collect())
    }

    fn channels(out: FunctionResult) -> BTreeMap<String, Value> {
        match out.unwrap() {
            FunctionOutput::Map(map) => map
                .into_iter()
                .map(|(k, v)| (k, serde_json::from_str(&v).unwrap()))
                .collect(),
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_summary_links_parsing() {
        let links = summary_links(LINKS);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "Handbook");
        assert_eq!(links[0].image_alt, "Book");
        assert!(links[0].open_in_new_window);
        assert_eq!(links[1].url, "https://www.contoso.com");
        assert!(summary_links("").is_empty());
    }

    #[test]
    fn test_summary_links_to_quick_links() {
        let out = channels(summary_links_to_quick_links(&ctx(), &args(&[LINKS, r#"{"layoutId":"CompactCard"}"#])));
        let props = &out["JsonProperties"];
        assert_eq!(props["layoutId"], "CompactCard");
        assert_eq!(props["items"].as_array().unwrap().len(), 2);
        assert_eq!(props["items"][0]["sourceItem"]["url"], "/sites/b/Pages/handbook.aspx");
        assert_eq!(out["Links"]["items[1].sourceItem.url"], "https://www.contoso.com");
        assert_eq!(out["SearchablePlainTexts"]["items[0].description"], "All rules");
        // no asset persistence configured, the image keeps its link
        assert_eq!(out["ImageSources"]["items[0].rawPreviewImageUrl"], "/sites/a/SiteAssets/book.png");
    }

    #[test]
    fn test_content_by_query_with_list() {
        let out = channels(content_by_query(
            &ctx(),
            &args(&["", NEWS, "", "100", "0x0104", "Title", "Asc", "5", "Title;Body"]),
        ));
        let props = &out["JsonProperties"];
        assert_eq!(props["query"]["contentLocation"], "List");
        assert_eq!(props["query"]["sortType"], "Alphabetical");
        assert_eq!(props["query"]["sortDirection"], "asc");
        assert_eq!(props["query"]["contentTypes"][0], "Announcement");
        assert_eq!(props["maxItemsPerPage"], 5);
        assert_eq!(props["lists"][0]["title"], "News");
        assert_eq!(props["displayColumns"], json!(["Title", "Body"]));
        assert_eq!(out["Links"]["lists[0].url"], "/sites/b/Lists/News");
    }

    #[test]
    fn test_content_by_query_site_defaults() {
        let out = channels(content_by_query(&ctx(), &args(&["", "", "", "", "", "", "", "abc", ""])));
        let props = &out["JsonProperties"];
        assert_eq!(props["query"]["contentLocation"], "CurrentSite");
        assert_eq!(props["query"]["sortType"], "MostRecent");
        assert_eq!(props["maxItemsPerPage"], DEFAULT_ITEM_LIMIT);
    }

    #[test]
    fn test_content_by_search() {
        let provider = r#"{"QueryTemplate":"ContentType:News {searchboxquery}","SourceID":"8413cd39-2156-4e00-b54d-11efd9abdb89"}"#;
        let out = channels(content_by_search(
            &ctx(),
            &args(&[provider, r#"["Title","Path"]"#, "10", "~sitecollection/_catalogs/masterpage/Display Templates/Content Web Parts/Control_SlideShow.js"]),
        ));
        let props = &out["JsonProperties"];
        assert_eq!(props["query"]["advancedQueryText"], "ContentType:News {searchboxquery}");
        assert_eq!(props["templateId"], "Carousel");
        assert_eq!(props["maxItemsPerPage"], 10);
        assert_eq!(props["displayColumns"], json!(["Title", "Path"]));
    }

    #[test]
    fn test_content_by_search_bad_json_degrades() {
        let out = channels(content_by_search(&ctx(), &args(&["{not json", "", "", ""])));
        assert_eq!(out["JsonProperties"]["query"]["advancedQueryText"], "");
        assert_eq!(out["JsonProperties"]["maxItemsPerPage"], DEFAULT_RESULTS_PER_PAGE);
    }
}
