//! Loading web part mapping files
//!
//! Mapping files are XML:
//!
//! ```xml
//! <WebPartMapping>
//!   <WebParts>
//!     <WebPart Type="Microsoft.SharePoint.WebPartPages.ContentEditorWebPart">
//!       <Properties>
//!         <Property Name="Content" Type="string" Functions="TextCleanup({Content},{UsePlaceHolders})" />
//!       </Properties>
//!       <Mappings Selector="ContentEmbedSelectorContentLink({ContentLink})">
//!         <Mapping Name="Content" Default="true" />
//!       </Mappings>
//!     </WebPart>
//!   </WebParts>
//! </WebPartMapping>
//! ```

use std::path::Path;

use serde::Deserialize;

use super::model::{MappingSet, MappingVariant, PropertyDefinition, WebPartDefinition};
use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
struct RawMappingFile {
    #[serde(rename = "WebParts", default)]
    web_parts: RawWebParts,
}

#[derive(Debug, Default, Deserialize)]
struct RawWebParts {
    #[serde(rename = "WebPart", default)]
    items: Vec<RawWebPart>,
}

#[derive(Debug, Deserialize)]
struct RawWebPart {
    #[serde(rename = "@Type")]
    type_name: String,
    #[serde(rename = "Properties", default)]
    properties: RawProperties,
    #[serde(rename = "Mappings")]
    mappings: Option<RawMappings>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProperties {
    #[serde(rename = "Property", default)]
    items: Vec<RawProperty>,
}

#[derive(Debug, Deserialize)]
struct RawProperty {
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@Type", default)]
    type_name: Option<String>,
    #[serde(rename = "@Functions", default)]
    functions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMappings {
    #[serde(rename = "@Selector", default)]
    selector: Option<String>,
    #[serde(rename = "Mapping", default)]
    items: Vec<RawMapping>,
}

#[derive(Debug, Deserialize)]
struct RawMapping {
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@Default", default)]
    default: bool,
    #[serde(rename = "@Functions", default)]
    functions: Option<String>,
}

impl From<RawWebPart> for WebPartDefinition {
    fn from(raw: RawWebPart) -> Self {
        WebPartDefinition {
            type_name: raw.type_name,
            properties: raw
                .properties
                .items
                .into_iter()
                .map(|p| PropertyDefinition {
                    name: p.name,
                    type_name: p.type_name.unwrap_or_else(|| "string".to_string()),
                    functions: p.functions.filter(|f| !f.trim().is_empty()),
                })
                .collect(),
            mappings: raw.mappings.map(|m| MappingSet {
                selector: m.selector.filter(|s| !s.trim().is_empty()),
                mappings: m
                    .items
                    .into_iter()
                    .map(|v| MappingVariant {
                        name: v.name,
                        default: v.default,
                        functions: v.functions.filter(|f| !f.trim().is_empty()),
                    })
                    .collect(),
            }),
        }
    }
}

/// A parsed mapping file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingFile {
    pub web_parts: Vec<WebPartDefinition>,
}

impl MappingFile {
    /// Parse a mapping file from XML text
    pub fn from_xml(xml: &str) -> Result<Self, ConfigError> {
        let raw: RawMappingFile = quick_xml::de::from_str(xml).map_err(ConfigError::Mapping)?;
        let web_parts: Vec<WebPartDefinition> =
            raw.web_parts.items.into_iter().map(Into::into).collect();
        log::debug!("Loaded mapping file with {} web part definitions", web_parts.len());
        Ok(MappingFile { web_parts })
    }

    /// Read and parse a mapping file from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let xml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_xml(&xml)
    }

    /// Find the definition for a web part type
    pub fn find(&self, type_name: &str) -> Option<&WebPartDefinition> {
        self.web_parts.iter().find(|w| w.matches_type(type_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<WebPartMapping>
  <WebParts>
    <WebPart Type="Microsoft.SharePoint.WebPartPages.PageViewerWebPart, Microsoft.SharePoint">
      <Properties>
        <Property Name="Title" Type="string" Functions="HtmlEncode({Title})" />
        <Property Name="SourceType" Type="string" />
        <Property Name="ContentLink" />
      </Properties>
      <Mappings Selector="ContentEmbedSelectorSourceType({SourceType})">
        <Mapping Name="WebPage" Default="true" Functions="StaticString('web')" />
        <Mapping Name="ServerFolderOrFile" Default="false" />
      </Mappings>
    </WebPart>
    <WebPart Type="Microsoft.SharePoint.WebPartPages.TitleBarWebPart">
      <Properties />
    </WebPart>
  </WebParts>
</WebPartMapping>"#;

    #[test]
    fn test_from_xml() {
        let file = MappingFile::from_xml(MAPPING).unwrap();
        assert_eq!(file.web_parts.len(), 2);

        let viewer = file
            .find("Microsoft.SharePoint.WebPartPages.PageViewerWebPart")
            .unwrap();
        assert_eq!(viewer.properties.len(), 3);
        assert_eq!(viewer.properties[0].function_chain(), Some("HtmlEncode({Title})"));
        assert_eq!(viewer.properties[2].type_name, "string");
        assert_eq!(
            viewer.selector(),
            Some("ContentEmbedSelectorSourceType({SourceType})")
        );
        let set = viewer.mappings.as_ref().unwrap();
        assert_eq!(set.mappings.len(), 2);
        assert!(set.mappings[0].default);
        assert!(set.mappings[1].functions.is_none());

        let title_bar = file
            .find("Microsoft.SharePoint.WebPartPages.TitleBarWebPart")
            .unwrap();
        assert!(title_bar.properties.is_empty());
        assert!(title_bar.mappings.is_none());
    }

    #[test]
    fn test_invalid_xml_is_error() {
        let result = MappingFile::from_xml("<WebPartMapping><WebParts><WebPart>");
        assert!(matches!(result, Err(ConfigError::Mapping(_))));
    }
}
