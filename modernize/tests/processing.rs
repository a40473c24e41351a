use std::sync::Arc;

use modernize::config::TransformSettings;
use modernize::error::FunctionError;
use modernize::functions::{FunctionProcessor, PublishingFunctionProcessor};
use modernize::mapping::{ContentUnit, MappingFile, WebPartDefinition, WebPartKind};
use modernize::source::{FolderAssetPersistence, InMemorySource, WebInfo};
use modernize::TransformationContext;

const SOURCE: &str = r#"{
  "web": { "url": "https://contoso.sharepoint.com/sites/intranet", "server_relative_url": "/sites/intranet" },
  "lists": [
    {
      "id": "11111111-2222-3333-4444-555555555555",
      "title": "Tasks",
      "base_type": "GenericList",
      "base_template": 107,
      "server_relative_url": "/sites/intranet/Lists/Tasks",
      "views": []
    }
  ],
  "files": [
    {
      "server_relative_url": "/sites/intranet/SiteAssets/banner.png",
      "list_id": "66666666-7777-8888-9999-000000000000",
      "unique_id": "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee",
      "content": "png"
    }
  ],
  "users": [],
  "terms": []
}"#;

const MAPPING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<WebPartMapping>
  <WebParts>
    <WebPart Type="Microsoft.SharePoint.WebPartPages.ContentEditorWebPart">
      <Properties>
        <Property Name="Title" Type="string" Functions="HtmlEncode({Title})" />
        <Property Name="Content" Type="string" Functions="{Missing} = UnknownFunction({Content})" />
      </Properties>
    </WebPart>
    <WebPart Type="Microsoft.SharePoint.WebPartPages.PageViewerWebPart">
      <Properties>
        <Property Name="SourceType" Type="string" />
      </Properties>
      <Mappings Selector="ContentEmbedSelectorSourceType({SourceType})">
        <Mapping Name="WebPage" Default="true" />
        <Mapping Name="ServerFolderOrFile" Functions="{Kind} = StaticString('folder, or (file)')" />
      </Mappings>
    </WebPart>
    <WebPart Type="Microsoft.SharePoint.WebPartPages.ImageWebPart">
      <Properties>
        <Property Name="ImageLink" Type="string" Functions="ImageLookup({ImageLink}); {Html} = PrefixAndSuffix('&lt;img src=&quot;','&quot; /&gt;',{ImageUrl},'false')" />
      </Properties>
    </WebPart>
    <WebPart Type="Microsoft.SharePoint.WebPartPages.XsltListViewWebPart">
      <Properties>
        <Property Name="ListId" Type="guid" />
        <Property Name="XmlDefinition" Type="string" />
      </Properties>
      <Mappings Selector="ListSelectorListLibrary({ListId},{XmlDefinition})">
        <Mapping Name="List" Default="true" />
      </Mappings>
    </WebPart>
  </WebParts>
</WebPartMapping>"#;

fn context() -> TransformationContext {
    let source = InMemorySource::from_json(SOURCE).unwrap();
    TransformationContext::new(Arc::new(source), TransformSettings::default())
}

fn definition(type_name: &str) -> WebPartDefinition {
    MappingFile::from_xml(MAPPING)
        .unwrap()
        .find(type_name)
        .cloned()
        .unwrap()
}

#[test]
fn html_encodes_title() {
    let ctx = context();
    let mut definition = definition("Microsoft.SharePoint.WebPartPages.ContentEditorWebPart");
    let mut unit = ContentUnit::new("ContentEditorWebPart", WebPartKind::Classic)
        .with_property("Title", "A & B")
        .with_property("Content", "<p>Body</p>");

    let outcome = FunctionProcessor::new(&ctx).process(&mut definition, &mut unit).unwrap();

    assert_eq!(unit.properties.get("Title"), Some("A &amp; B"));
    // Unknown functions produce nothing
    assert_eq!(unit.properties.get("Content"), Some("<p>Body</p>"));
    assert!(!unit.properties.contains("Missing"));
    assert_eq!(unit.properties.len(), 2);
    assert!(outcome.skipped.is_empty());
    assert!(outcome.selector.is_none());
}

#[test]
fn selector_picks_mapping_variant() {
    let ctx = context();
    let processor = FunctionProcessor::new(&ctx);

    for (source_type, expected) in [("4", "WebPage"), ("2", "ServerFolderOrFile")] {
        let mut definition = definition("Microsoft.SharePoint.WebPartPages.PageViewerWebPart");
        let mut unit = ContentUnit::new("PageViewerWebPart", WebPartKind::Classic)
            .with_property("SourceType", source_type);

        let outcome = processor.process(&mut definition, &mut unit).unwrap();

        assert_eq!(outcome.selector.as_deref(), Some(expected));
        let variant = definition.select_mapping(outcome.selector.as_deref()).unwrap();
        assert_eq!(variant.name, expected);
    }
}

#[test]
fn variant_functions_keep_literal_commas() {
    let ctx = context();
    let processor = FunctionProcessor::new(&ctx);
    let mut definition = definition("Microsoft.SharePoint.WebPartPages.PageViewerWebPart");
    let mut unit =
        ContentUnit::new("PageViewerWebPart", WebPartKind::Classic).with_property("SourceType", "3");

    let outcome = processor.process(&mut definition, &mut unit).unwrap();
    let functions = definition
        .select_mapping(outcome.selector.as_deref())
        .and_then(|v| v.functions.clone())
        .unwrap();
    processor
        .process_functions(&functions, &mut definition, &mut unit)
        .unwrap();

    assert_eq!(unit.properties.get("Kind"), Some("folder, or (file)"));
}

#[test]
fn map_outputs_feed_later_functions() {
    let ctx = context();
    let mut definition = definition("Microsoft.SharePoint.WebPartPages.ImageWebPart");
    let mut unit = ContentUnit::new("ImageWebPart", WebPartKind::Classic)
        .with_property("ImageLink", "/sites/intranet/SiteAssets/banner.png");

    FunctionProcessor::new(&ctx).process(&mut definition, &mut unit).unwrap();

    assert_eq!(
        unit.properties.get("ImageListId"),
        Some("66666666-7777-8888-9999-000000000000")
    );
    assert_eq!(
        unit.properties.get("Html"),
        Some(r#"<img src="/sites/intranet/SiteAssets/banner.png" />"#)
    );
    assert!(definition.property("ImageUniqueId").is_some());
}

#[test]
fn calendar_views_win_over_list_template() {
    let ctx = context();
    let processor = FunctionProcessor::new(&ctx);

    let cases = [
        (r#"<View Type="CALENDAR"><ViewFields /></View>"#, "Calendar"),
        (r#"<View Type="HTML"><ViewFields /></View>"#, "Task"),
    ];
    for (view, expected) in cases {
        let mut definition = definition("Microsoft.SharePoint.WebPartPages.XsltListViewWebPart");
        let mut unit = ContentUnit::new("XsltListViewWebPart", WebPartKind::Classic)
            .with_property("ListId", "11111111-2222-3333-4444-555555555555")
            .with_property("XmlDefinition", view);

        let outcome = processor.process(&mut definition, &mut unit).unwrap();
        assert_eq!(outcome.selector.as_deref(), Some(expected));
    }
}

#[test]
fn cross_site_images_are_transferred_once() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context()
        .with_target(WebInfo::new("https://contoso.sharepoint.com/sites/news"))
        .with_assets(Arc::new(FolderAssetPersistence::new(
            dir.path(),
            "/sites/news/SiteAssets/migrated",
        )));
    let mut definition = definition("Microsoft.SharePoint.WebPartPages.ImageWebPart");
    let mut unit = ContentUnit::new("ImageWebPart", WebPartKind::Classic)
        .with_property("ImageLink", "/sites/intranet/SiteAssets/banner.png");

    FunctionProcessor::new(&ctx).process(&mut definition, &mut unit).unwrap();

    assert_eq!(
        unit.properties.get("ImageUrl"),
        Some("/sites/news/SiteAssets/migrated/banner.png")
    );
    assert_eq!(std::fs::read(dir.path().join("banner.png")).unwrap(), b"png");
    assert_eq!(ctx.cache().assets.len(), 1);
}

#[test]
fn policy_violations_stop_the_unit() {
    let ctx = context();
    let mut definition = WebPartDefinition::new("DocumentEmbed").with_property(
        modernize::mapping::PropertyDefinition::new("Url", "string")
            .with_functions("DocumentEmbedLookup({Url})"),
    );
    let mut unit = ContentUnit::new("DocumentEmbed", WebPartKind::Classic)
        .with_property("Url", "/sites/intranet/SitePages/Home.aspx");

    let error = FunctionProcessor::new(&ctx)
        .process(&mut definition, &mut unit)
        .unwrap_err();
    assert!(matches!(error, FunctionError::Policy(_)));
}

#[test]
fn publishing_fields_use_the_publishing_library() {
    let ctx = context();
    let mut unit = ContentUnit::new("ArticlePage", WebPartKind::Classic)
        .with_property("PublishingPageImage", r#"<img alt="Banner" src="/sites/intranet/SiteAssets/banner.png" />"#);
    let processor = PublishingFunctionProcessor::new(&ctx);

    let alt = processor
        .process_field("ImageAlt", "ToImageAltText({PublishingPageImage})", &mut unit)
        .unwrap();
    assert_eq!(alt, Some(("ImageAlt".to_string(), "Banner".to_string())));
    assert_eq!(unit.properties.get("ImageAlt"), Some("Banner"));
}

#[test]
fn units_can_be_processed_concurrently() {
    let ctx = context();
    let results: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ctx = &ctx;
                scope.spawn(move || {
                    let mut definition = definition("Microsoft.SharePoint.WebPartPages.ContentEditorWebPart");
                    let mut unit = ContentUnit::new("ContentEditorWebPart", WebPartKind::Classic)
                        .with_property("Title", format!("{} < {}", i, i + 1))
                        .with_property("Content", "");
                    FunctionProcessor::new(ctx)
                        .process(&mut definition, &mut unit)
                        .unwrap();
                    unit.properties.get("Title").unwrap().to_string()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, title) in results.iter().enumerate() {
        assert_eq!(title, &format!("{} &lt; {}", i, i + 1));
    }
}
