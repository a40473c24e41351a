//! Path, image, document and media functions

use super::param;
use crate::config::{AssetClass, extension_of};
use crate::context::TransformationContext;
use crate::error::PolicyViolation;
use crate::functions::coerce::{Args, ParamType};
use crate::functions::definition::FunctionOutput;
use crate::functions::registry::{BuiltinFunction, FunctionDoc, FunctionKind, FunctionResult};
use crate::source::FileInfo;

/// Strip scheme and host from absolute URLs; server-relative input is kept
pub(crate) fn to_server_relative(path: &str) -> String {
    let path = path.trim();
    let lower = path.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        let rest = &path[path.find("://").map_or(0, |i| i + 3)..];
        return match rest.find('/') {
            Some(i) => rest[i..].to_string(),
            None => "/".to_string(),
        };
    }
    path.to_string()
}

/// Server-relative path without query string or fragment
fn lookup_path(path: &str) -> String {
    let relative = to_server_relative(path);
    relative
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_string()
}

fn file_name_of(path: &str) -> String {
    let path = lookup_path(path);
    let name = path.rsplit('/').next().unwrap_or_default();
    urlencoding::decode(name)
        .map(|n| n.into_owned())
        .unwrap_or_else(|_| name.to_string())
}

/// Copy an asset to the target site when content moves across sites.
///
/// Returns the new location, or the original link whenever no transfer is
/// needed or possible.
pub fn transfer_asset(ctx: &TransformationContext, link: &str) -> String {
    let original = link.trim();
    if original.is_empty() {
        return String::new();
    }

    let path = lookup_path(original);
    match ctx.settings().classify(&path) {
        AssetClass::Blocked => {
            log::error!(
                "Asset '{}' has a blocked extension ({}), keeping the original link",
                original,
                extension_of(&path).unwrap_or_default()
            );
            return original.to_string();
        }
        AssetClass::Unsupported => {
            log::warn!("Asset '{}' has no supported extension, keeping the original link", original);
            return original.to_string();
        }
        AssetClass::Image | AssetClass::Document => {}
    }

    if !ctx.is_cross_site() {
        return original.to_string();
    }

    if !ctx.source_web().contains_path(&path) {
        log::warn!(
            "Asset '{}' lives outside the source site '{}', keeping the original link",
            original,
            ctx.source_web().url
        );
        return original.to_string();
    }

    let Some(assets) = ctx.assets() else {
        log::warn!("No asset persistence configured, keeping the original link for '{}'", original);
        return original.to_string();
    };

    let key = path.to_lowercase();
    if let Some(copied) = ctx.cache().assets.get(&key) {
        return copied;
    }

    let content = match ctx.source().file_content(&path) {
        Ok(Some(content)) => content,
        Ok(None) => {
            log::warn!("Asset '{}' was not found, keeping the original link", original);
            return original.to_string();
        }
        Err(e) => {
            log::warn!("Could not read asset '{}': {}", original, e);
            return original.to_string();
        }
    };

    match assets.write_asset(&content, &file_name_of(&path)) {
        Ok(copied) => {
            log::info!("Transferred asset '{}' to '{}'", original, copied);
            ctx.cache().assets.insert(key, copied.clone());
            copied
        }
        Err(e) => {
            log::warn!("Could not persist asset '{}': {}", original, e);
            original.to_string()
        }
    }
}

/// File metadata for a path inside the source web; `None` is logged
fn lookup_file(ctx: &TransformationContext, link: &str, what: &str) -> Option<FileInfo> {
    let path = lookup_path(link);
    if path.is_empty() {
        return None;
    }
    if !ctx.source_web().contains_path(&path) {
        log::warn!("{} '{}' is not part of site '{}'", what, link, ctx.source_web().url);
        return None;
    }
    match ctx.source().file(&path) {
        Ok(Some(file)) => Some(file),
        Ok(None) => {
            log::warn!("{} '{}' was not found", what, link);
            None
        }
        Err(e) => {
            log::warn!("Lookup of {} '{}' failed: {}", what.to_lowercase(), link, e);
            None
        }
    }
}

fn return_server_relative_path(_: &TransformationContext, args: &Args) -> FunctionResult {
    Ok(to_server_relative(&args.text(0)).into())
}

fn return_file_name(_: &TransformationContext, args: &Args) -> FunctionResult {
    Ok(file_name_of(&args.text(0)).into())
}

fn return_cross_site_relative_path(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    Ok(transfer_asset(ctx, &args.text(0)).into())
}

fn load_content_from_file(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let link = args.text(0);
    let path = lookup_path(&link);
    if path.is_empty() {
        return Ok(FunctionOutput::Text(String::new()));
    }
    if extension_of(&path).as_deref() == Some("aspx") {
        log::warn!("Content link '{}' points to a page, not loading it", link);
        return Ok(FunctionOutput::Text(String::new()));
    }
    if !ctx.source_web().contains_path(&path) {
        log::warn!("Content link '{}' is not part of site '{}'", link, ctx.source_web().url);
        return Ok(FunctionOutput::Text(String::new()));
    }

    let content = match ctx.source().file_content(&path) {
        Ok(Some(bytes)) => String::from_utf8_lossy(&bytes)
            .trim_start_matches('\u{feff}')
            .to_string(),
        Ok(None) => {
            log::warn!("Content file '{}' was not found", link);
            String::new()
        }
        Err(e) => {
            log::warn!("Could not load content file '{}': {}", link, e);
            String::new()
        }
    };
    Ok(content.into())
}

fn image_lookup(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let link = args.text(0);
    let Some(file) = lookup_file(ctx, &link, "Image") else {
        return Ok(FunctionOutput::empty_map());
    };
    Ok(FunctionOutput::map([
        ("ImageListId", file.list_id.to_string()),
        ("ImageUniqueId", file.unique_id.to_string()),
        ("ImageUrl", transfer_asset(ctx, &link)),
    ]))
}

fn image_anchor_url_rewrite(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let anchor = args.text(0);
    if anchor.trim().is_empty() {
        return Ok(FunctionOutput::Text(String::new()));
    }
    if ctx.settings().classify(&lookup_path(&anchor)) == AssetClass::Image {
        return Ok(transfer_asset(ctx, &anchor).into());
    }
    if ctx.settings().skip_url_rewrite {
        return Ok(anchor.into_owned().into());
    }
    Ok(ctx.url_mapper().map_url(&anchor).into())
}

fn document_embed_lookup(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let link = args.text(0);
    if extension_of(&lookup_path(&link)).as_deref() == Some("aspx") {
        return Err(PolicyViolation::PageNotAvailableAtTarget {
            path: link.into_owned(),
        }
        .into());
    }
    let Some(file) = lookup_file(ctx, &link, "Document") else {
        return Ok(FunctionOutput::empty_map());
    };
    let author = if file.author_login.is_empty() {
        String::new()
    } else {
        ctx.user_mapper().map_user(&file.author_login)
    };
    Ok(FunctionOutput::map([
        ("DocumentListId", file.list_id.to_string()),
        ("DocumentUniqueId", file.unique_id.to_string()),
        ("DocumentAuthor", author),
        ("DocumentAuthorName", file.author_name),
    ]))
}

fn media_lookup(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let source = args.text(0);
    if source.trim().is_empty() {
        return Err(PolicyViolation::MediaSourceMissing {
            web_part: "MediaWebPart".to_string(),
        }
        .into());
    }
    let Some(file) = lookup_file(ctx, &source, "Media file") else {
        return Ok(FunctionOutput::empty_map());
    };
    Ok(FunctionOutput::map([
        ("MediaListId", file.list_id.to_string()),
        ("MediaUniqueId", file.unique_id.to_string()),
        ("MediaUrl", transfer_asset(ctx, &source)),
    ]))
}

pub(super) const FUNCTIONS: &[BuiltinFunction] = &[
    BuiltinFunction {
        name: "ReturnServerRelativePath",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Turns an absolute url into a server relative one.",
            example: "ReturnServerRelativePath({ImageLink})",
            params: &[param("path", ParamType::String, "Absolute or server relative url")],
            returns: "Server relative url",
        },
        handler: return_server_relative_path,
    },
    BuiltinFunction {
        name: "ReturnFileName",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Returns the file name of a url, without query string.",
            example: "{ImageFileName} = ReturnFileName({ImageLink})",
            params: &[param("path", ParamType::String, "Url of the file")],
            returns: "Decoded file name",
        },
        handler: return_file_name,
    },
    BuiltinFunction {
        name: "ReturnCrossSiteRelativePath",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Copies an image or document to the target site when transforming across sites and returns its new location. Same-site, blocked or missing assets keep their original link.",
            example: "ReturnCrossSiteRelativePath({ImageUrl})",
            params: &[param("path", ParamType::String, "Url of the asset")],
            returns: "Url of the asset on the target site",
        },
        handler: return_cross_site_relative_path,
    },
    BuiltinFunction {
        name: "LoadContentFromFile",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Loads the text content of a file linked from a content editor.",
            example: "{Text} = LoadContentFromFile({ContentLink})",
            params: &[param("contentLink", ParamType::String, "Server relative url of the file")],
            returns: "File content, empty when it cannot be loaded",
        },
        handler: load_content_from_file,
    },
    BuiltinFunction {
        name: "ImageLookup",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Looks up the list and unique id of an image in the source site and transfers it when needed.",
            example: "ImageLookup({ImageUrl})",
            params: &[param("serverRelativeImagePath", ParamType::String, "Server relative url of the image")],
            returns: "ImageListId, ImageUniqueId and ImageUrl",
        },
        handler: image_lookup,
    },
    BuiltinFunction {
        name: "ImageAnchorUrlRewrite",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Rewrites the link an image points to. Links to images are transferred like the image itself.",
            example: "{Anchor} = ImageAnchorUrlRewrite({Anchor})",
            params: &[param("anchor", ParamType::String, "Link behind the image")],
            returns: "Rewritten link",
        },
        handler: image_anchor_url_rewrite,
    },
    BuiltinFunction {
        name: "DocumentEmbedLookup",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Looks up an embedded document. Pages cannot be embedded and stop the transformation of the web part.",
            example: "DocumentEmbedLookup({ServerRelativeUrl})",
            params: &[param("serverRelativeUrl", ParamType::String, "Server relative url of the document")],
            returns: "DocumentListId, DocumentUniqueId, DocumentAuthor and DocumentAuthorName",
        },
        handler: document_embed_lookup,
    },
    BuiltinFunction {
        name: "MediaLookup",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Looks up the video of a media web part. A web part without a video stops its transformation.",
            example: "MediaLookup({MediaSource})",
            params: &[param("mediaSource", ParamType::String, "Server relative url of the video")],
            returns: "MediaListId, MediaUniqueId and MediaUrl",
        },
        handler: media_lookup,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformSettings;
    use crate::error::FunctionError;
    use crate::functions::coerce::Arg;
    use crate::source::{FolderAssetPersistence, InMemorySource, WebInfo};
    use std::sync::Arc;
    use uuid::Uuid;

    const LIST_ID: &str = "a1b2c3d4-e5f6-7890-abcd-ef1234567890";

    fn source() -> InMemorySource {
        let file = |path: &str| FileInfo {
            server_relative_url: path.to_string(),
            list_id: Uuid::parse_str(LIST_ID).unwrap(),
            unique_id: Uuid::new_v4(),
            author_login: "i:0#.f|membership|anna@contoso.com".into(),
            author_name: "Anna".into(),
        };
        InMemorySource::new("https://contoso.sharepoint.com/sites/a")
            .with_file(file("/sites/a/SiteAssets/logo.png"), b"png".to_vec())
            .with_file(file("/sites/a/Shared Documents/plan.docx"), b"docx".to_vec())
            .with_file(file("/sites/a/SiteAssets/intro.html"), "\u{feff}<p>Intro</p>".as_bytes().to_vec())
            .with_file(file("/sites/a/SiteAssets/tool.exe"), b"MZ".to_vec())
    }

    fn same_site() -> TransformationContext {
        TransformationContext::new(Arc::new(source()), TransformSettings::default())
    }

    fn cross_site(dir: &std::path::Path) -> TransformationContext {
        same_site()
            .with_target(WebInfo::new("https://contoso.sharepoint.com/sites/b"))
            .with_assets(Arc::new(FolderAssetPersistence::new(dir, "/sites/b/SiteAssets/migrated")))
    }

    fn args(values: &[&str]) -> Args {
        Args::new(values.iter().map(|v| Arg::String(v.to_string())).collect())
    }

    fn text(out: FunctionResult) -> String {
        out.unwrap().as_scalar().unwrap()
    }

    #[test]
    fn test_server_relative_and_file_name() {
        assert_eq!(
            to_server_relative("https://contoso.sharepoint.com/sites/a/x.png"),
            "/sites/a/x.png"
        );
        assert_eq!(to_server_relative("https://contoso.sharepoint.com"), "/");
        assert_eq!(to_server_relative("/sites/a/x.png"), "/sites/a/x.png");
        assert_eq!(
            text(return_file_name(&same_site(), &args(&["/sites/a/My%20Image.png?rev=1"]))),
            "My Image.png"
        );
    }

    #[test]
    fn test_cross_site_path_same_site_unchanged() {
        let out = return_cross_site_relative_path(&same_site(), &args(&["/sites/a/SiteAssets/logo.png"]));
        assert_eq!(text(out), "/sites/a/SiteAssets/logo.png");
    }

    #[test]
    fn test_cross_site_path_blocked_extension_keeps_link() {
        let dir = tempfile::tempdir().unwrap();
        let out = return_cross_site_relative_path(&cross_site(dir.path()), &args(&["/sites/a/SiteAssets/tool.exe"]));
        assert_eq!(text(out), "/sites/a/SiteAssets/tool.exe");
        assert!(!dir.path().join("tool.exe").exists());
    }

    #[test]
    fn test_cross_site_transfer_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = cross_site(dir.path());
        let out = text(return_cross_site_relative_path(&ctx, &args(&["/sites/a/SiteAssets/logo.png"])));
        assert_eq!(out, "/sites/b/SiteAssets/migrated/logo.png");
        assert_eq!(std::fs::read(dir.path().join("logo.png")).unwrap(), b"png");

        std::fs::remove_file(dir.path().join("logo.png")).unwrap();
        let again = text(return_cross_site_relative_path(&ctx, &args(&["/sites/a/siteassets/LOGO.png"])));
        assert_eq!(again, out);
        assert!(!dir.path().join("logo.png").exists());
    }

    #[test]
    fn test_cross_site_same_file_name_from_different_folders() {
        let dir = tempfile::tempdir().unwrap();
        let file = |path: &str| FileInfo {
            server_relative_url: path.to_string(),
            list_id: Uuid::parse_str(LIST_ID).unwrap(),
            unique_id: Uuid::new_v4(),
            author_login: String::new(),
            author_name: String::new(),
        };
        let source = source()
            .with_file(file("/sites/a/News/logo.png"), b"news".to_vec())
            .with_file(file("/sites/a/HR/logo.png"), b"hr".to_vec());
        let ctx = TransformationContext::new(Arc::new(source), TransformSettings::default())
            .with_target(WebInfo::new("https://contoso.sharepoint.com/sites/b"))
            .with_assets(Arc::new(FolderAssetPersistence::new(dir.path(), "/sites/b/SiteAssets")));

        let news = text(return_cross_site_relative_path(&ctx, &args(&["/sites/a/News/logo.png"])));
        let hr = text(return_cross_site_relative_path(&ctx, &args(&["/sites/a/HR/logo.png"])));

        assert_ne!(news, hr);
        assert_eq!(news, "/sites/b/SiteAssets/logo.png");
        assert_eq!(hr, "/sites/b/SiteAssets/logo-1.png");
        assert_eq!(std::fs::read(dir.path().join("logo.png")).unwrap(), b"news");
        assert_eq!(std::fs::read(dir.path().join("logo-1.png")).unwrap(), b"hr");
    }

    #[test]
    fn test_cross_site_outside_source_keeps_link() {
        let dir = tempfile::tempdir().unwrap();
        let out = return_cross_site_relative_path(&cross_site(dir.path()), &args(&["/sites/other/logo.png"]));
        assert_eq!(text(out), "/sites/other/logo.png");
    }

    #[test]
    fn test_image_lookup() {
        match image_lookup(&same_site(), &args(&["/sites/a/SiteAssets/logo.png"])).unwrap() {
            FunctionOutput::Map(map) => {
                assert_eq!(map["ImageListId"], LIST_ID);
                assert_eq!(map["ImageUrl"], "/sites/a/SiteAssets/logo.png");
                assert!(map.contains_key("ImageUniqueId"));
            }
            other => panic!("expected map, got {:?}", other),
        }
        assert_eq!(
            image_lookup(&same_site(), &args(&["/sites/a/SiteAssets/missing.png"])).unwrap(),
            FunctionOutput::empty_map()
        );
        assert_eq!(
            image_lookup(&same_site(), &args(&["/sites/x/logo.png"])).unwrap(),
            FunctionOutput::empty_map()
        );
    }

    #[test]
    fn test_document_embed_lookup() {
        let out = document_embed_lookup(&same_site(), &args(&["/sites/a/Shared Documents/plan.docx"])).unwrap();
        let FunctionOutput::Map(map) = out else {
            panic!("expected map");
        };
        assert_eq!(map["DocumentAuthor"], "i:0#.f|membership|anna@contoso.com");
        assert_eq!(map["DocumentAuthorName"], "Anna");
    }

    #[test]
    fn test_document_embed_page_is_policy_violation() {
        let err = document_embed_lookup(&same_site(), &args(&["/sites/a/Pages/home.aspx"])).unwrap_err();
        assert!(matches!(
            err,
            FunctionError::Policy(PolicyViolation::PageNotAvailableAtTarget { .. })
        ));
    }

    #[test]
    fn test_media_lookup_without_source() {
        let err = media_lookup(&same_site(), &args(&[""])).unwrap_err();
        assert!(matches!(err, FunctionError::Policy(PolicyViolation::MediaSourceMissing { .. })));
    }

    #[test]
    fn test_load_content_from_file() {
        assert_eq!(
            text(load_content_from_file(&same_site(), &args(&["/sites/a/SiteAssets/intro.html"]))),
            "<p>Intro</p>"
        );
        assert_eq!(text(load_content_from_file(&same_site(), &args(&["/sites/a/SiteAssets/none.html"]))), "");
        assert_eq!(text(load_content_from_file(&same_site(), &args(&["/sites/a/Pages/a.aspx"]))), "");
    }

    #[test]
    fn test_image_anchor_rewrite() {
        let ctx = same_site().with_target(WebInfo::new("https://contoso.sharepoint.com/sites/b"));
        assert_eq!(
            text(image_anchor_url_rewrite(&ctx, &args(&["/sites/a/Pages/news.aspx"]))),
            "/sites/b/Pages/news.aspx"
        );
    }
}
