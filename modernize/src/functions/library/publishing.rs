//! Publishing page field functions

use serde::Serialize;
use uuid::Uuid;

use super::assets::transfer_asset;
use super::param;
use super::people::resolve_person;
use crate::context::TransformationContext;
use crate::functions::coerce::{Args, ParamType, datetime_fallback};
use crate::functions::registry::{BuiltinFunction, FunctionDoc, FunctionKind, FunctionResult};
use crate::html;

/// Returned instead of a term list when the target field keeps its value
pub const KEEP_EXISTING_VALUE: &str = "[[KEEP]]";

/// Placeholder token resolved into a taxonomy field value by the page builder
pub fn term_token(id: Uuid, label: &str) -> String {
    format!("{{{{TermId:{}|{}}}}}", id, label)
}

/// Image source of a publishing image field; plain links pass through
fn image_source(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if !value.contains('<') {
        return Some(value.to_string());
    }
    html::images(value).into_iter().next().map(|img| img.src)
}

fn to_image_url(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let url = image_source(&args.text(0))
        .map(|src| transfer_asset(ctx, &src))
        .unwrap_or_default();
    Ok(url.into())
}

fn to_image_alt_text(_: &TransformationContext, args: &Args) -> FunctionResult {
    let alt = html::images(&args.text(0))
        .into_iter()
        .next()
        .map(|img| img.alt)
        .unwrap_or_default();
    Ok(alt.into())
}

fn to_image_anchor(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let Some(anchor) = html::anchors(&args.text(0)).into_iter().next() else {
        return Ok(String::new().into());
    };
    if ctx.settings().skip_url_rewrite {
        return Ok(anchor.href.into());
    }
    Ok(ctx.url_mapper().map_url(&anchor.href).into())
}

fn to_preview_image_url(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let Some(src) = image_source(&args.text(0)) else {
        return Ok(String::new().into());
    };
    let path = transfer_asset(ctx, &src);
    if path.starts_with('/') {
        return Ok(format!("{}{}", ctx.target_web().host_url(), path).into());
    }
    Ok(path.into())
}

/// Author entry of a modern page header
#[derive(Debug, Serialize)]
struct PageAuthor {
    id: String,
    upn: String,
    name: String,
    role: String,
}

/// Split a user field value into the identities it references.
///
/// Lookup values come as `7;#Anna Smith;#9;#Bob`, multi-person text as
/// `anna@contoso.com;bob@contoso.com`.
fn user_field_entries(value: &str) -> Vec<&str> {
    if value.contains(";#") {
        value.split(";#").step_by(2).map(str::trim).filter(|v| !v.is_empty()).collect()
    } else {
        value.split(';').map(str::trim).filter(|v| !v.is_empty()).collect()
    }
}

fn to_authors(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let field = args.text(0);
    let authors: Vec<PageAuthor> = user_field_entries(&field)
        .into_iter()
        .filter_map(|entry| resolve_person(ctx, entry))
        .filter(|person| {
            if person.is_group {
                log::debug!("Skipping group '{}' as page author", person.name);
            }
            !person.is_group
        })
        .map(|person| PageAuthor {
            id: format!("i:0#.f|membership|{}", person.upn),
            upn: person.upn,
            name: person.name,
            role: person.role,
        })
        .collect();

    let json = serde_json::to_string(&authors).unwrap_or_else(|e| {
        log::warn!("Could not serialize page authors: {}", e);
        "[]".to_string()
    });
    Ok(json.into())
}

fn to_date(_: &TransformationContext, args: &Args) -> FunctionResult {
    let value = args.datetime(0);
    if value == datetime_fallback() {
        return Ok(String::new().into());
    }
    Ok(value.to_rfc3339_opts(chrono::SecondsFormat::Secs, true).into())
}

/// Resolve `|` or `;` separated term ids into tokens; unknown terms are skipped
fn taxonomy_terms(ctx: &TransformationContext, term_ids: &str) -> String {
    term_ids
        .split(['|', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter_map(|t| Uuid::parse_str(t).ok())
        .filter_map(|id| match ctx.source().term(id) {
            Ok(Some(term)) => Some(term_token(term.id, &term.label)),
            Ok(None) => {
                log::warn!("Term {} not found in the term store, skipping", id);
                None
            }
            Err(e) => {
                log::warn!("Lookup of term {} failed: {}", id, e);
                None
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn to_taxonomy_terms(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    Ok(taxonomy_terms(ctx, &args.text(0)).into())
}

fn default_taxonomy_field_value(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let overwrite = args.bool(2) || ctx.settings().overwrite_taxonomy;
    if !args.text(0).trim().is_empty() && !overwrite {
        return Ok(KEEP_EXISTING_VALUE.into());
    }
    Ok(taxonomy_terms(ctx, &args.text(1)).into())
}

pub(super) const FUNCTIONS: &[BuiltinFunction] = &[
    BuiltinFunction {
        name: "ToImageUrl",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Returns the image url of a publishing image field, transferring the image when the page moves across sites.",
            example: "ToImageUrl({PublishingPageImage})",
            params: &[param("value", ParamType::String, "Publishing image field html")],
            returns: "Image url",
        },
        handler: to_image_url,
    },
    BuiltinFunction {
        name: "ToImageAltText",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Returns the alternate text of a publishing image field.",
            example: "ToImageAltText({PublishingPageImage})",
            params: &[param("value", ParamType::String, "Publishing image field html")],
            returns: "Alternate text",
        },
        handler: to_image_alt_text,
    },
    BuiltinFunction {
        name: "ToImageAnchor",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Returns the link wrapped around a publishing image, rewritten for the target site.",
            example: "ToImageAnchor({PublishingPageImage})",
            params: &[param("value", ParamType::String, "Publishing image field html")],
            returns: "Anchor url",
        },
        handler: to_image_anchor,
    },
    BuiltinFunction {
        name: "ToPreviewImageUrl",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Returns the absolute url of the page preview image, transferring the image when needed.",
            example: "ToPreviewImageUrl({PublishingRollupImage})",
            params: &[param("value", ParamType::String, "Publishing image field html")],
            returns: "Absolute image url",
        },
        handler: to_preview_image_url,
    },
    BuiltinFunction {
        name: "ToAuthors",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Resolves the people of a user field into page author entries. Groups are left out.",
            example: "ToAuthors({PublishingContact})",
            params: &[param("userField", ParamType::String, "User field value")],
            returns: "JSON array of authors",
        },
        handler: to_authors,
    },
    BuiltinFunction {
        name: "ToDate",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Formats a date field as RFC 3339.",
            example: "ToDate({ArticleStartDate})",
            params: &[param("value", ParamType::DateTime, "Date field value")],
            returns: "RFC 3339 date, empty when the value is not a date",
        },
        handler: to_date,
    },
    BuiltinFunction {
        name: "ToTaxonomyTerms",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Resolves term ids into taxonomy field tokens. Unknown terms are skipped.",
            example: "ToTaxonomyTerms({TaxKeyword})",
            params: &[param("termIds", ParamType::String, "Term ids separated by |")],
            returns: "Term tokens separated by ;",
        },
        handler: to_taxonomy_terms,
    },
    BuiltinFunction {
        name: "DefaultTaxonomyFieldValue",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Sets a default taxonomy value unless the field already has one.",
            example: "DefaultTaxonomyFieldValue({TaxField},'a1b2c3d4-e5f6-7890-abcd-ef1234567890','false')",
            params: &[
                param("currentValue", ParamType::String, "Current field value"),
                param("termIds", ParamType::String, "Default term ids separated by |"),
                param("overwrite", ParamType::Bool, "Replace an existing value"),
            ],
            returns: "Term tokens, or [[KEEP]] when the existing value stays",
        },
        handler: default_taxonomy_field_value,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformSettings;
    use crate::functions::coerce::Arg;
    use crate::source::{
        FileInfo, FolderAssetPersistence, InMemorySource, PrincipalType, UserRecord, WebInfo,
    };
    use std::sync::Arc;

    const TERM: &str = "0b1c2d3e-4f50-6172-8394-a5b6c7d8e9f0";
    const IMAGE: &str = r#"<img src="/sites/a/SiteAssets/hero.png" alt="Hero" />"#;

    fn source() -> InMemorySource {
        let user = |id: i32, login: &str, name: &str, principal_type| UserRecord {
            id,
            login_name: login.into(),
            name: name.into(),
            email: String::new(),
            job_title: "Writer".into(),
            department: String::new(),
            work_phone: String::new(),
            sip_address: String::new(),
            principal_type,
        };
        InMemorySource::new("https://contoso.sharepoint.com/sites/a")
            .with_file(
                FileInfo {
                    server_relative_url: "/sites/a/SiteAssets/hero.png".into(),
                    list_id: Uuid::new_v4(),
                    unique_id: Uuid::new_v4(),
                    author_login: String::new(),
                    author_name: String::new(),
                },
                b"png".to_vec(),
            )
            .with_user(user(7, "i:0#.f|membership|anna@contoso.com", "Anna Smith", PrincipalType::User))
            .with_user(user(9, "c:0t.c|tenant|1234", "Everyone", PrincipalType::SecurityGroup))
            .with_term(Uuid::parse_str(TERM).unwrap(), "News")
    }

    fn ctx() -> TransformationContext {
        TransformationContext::new(Arc::new(source()), TransformSettings::default())
    }

    fn run(handler: fn(&TransformationContext, &Args) -> FunctionResult, ctx: &TransformationContext, values: Vec<Arg>) -> String {
        handler(ctx, &Args::new(values)).unwrap().as_scalar().unwrap()
    }

    fn s(value: &str) -> Arg {
        Arg::String(value.into())
    }

    #[test]
    fn test_image_fields() {
        let ctx = ctx();
        assert_eq!(run(to_image_url, &ctx, vec![s(IMAGE)]), "/sites/a/SiteAssets/hero.png");
        assert_eq!(run(to_image_alt_text, &ctx, vec![s(IMAGE)]), "Hero");
        assert_eq!(run(to_image_url, &ctx, vec![s("")]), "");
        let linked = format!(r#"<a href="https://contoso.sharepoint.com/sites/a/Pages/x.aspx">{}</a>"#, IMAGE);
        assert_eq!(
            run(to_image_anchor, &ctx, vec![s(&linked)]),
            "https://contoso.sharepoint.com/sites/a/Pages/x.aspx"
        );
    }

    #[test]
    fn test_preview_image_is_transferred_and_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx()
            .with_target(WebInfo::new("https://contoso.sharepoint.com/sites/b"))
            .with_assets(Arc::new(FolderAssetPersistence::new(dir.path(), "/sites/b/SiteAssets/migrated")));
        assert_eq!(
            run(to_preview_image_url, &ctx, vec![s(IMAGE)]),
            "https://contoso.sharepoint.com/sites/b/SiteAssets/migrated/hero.png"
        );
        assert!(dir.path().join("hero.png").exists());
    }

    #[test]
    fn test_authors_skip_groups() {
        let ctx = ctx();
        let json = run(to_authors, &ctx, vec![s("7;#Anna Smith;#9;#Everyone")]);
        let authors: serde_json::Value = serde_json::from_str(&json).unwrap();
        let authors = authors.as_array().unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0]["name"], "Anna Smith");
        assert_eq!(authors[0]["upn"], "anna@contoso.com");
        assert_eq!(authors[0]["id"], "i:0#.f|membership|anna@contoso.com");
        assert_eq!(run(to_authors, &ctx, vec![s("")]), "[]");
    }

    #[test]
    fn test_user_field_entries() {
        assert_eq!(user_field_entries("7;#Anna;#9;#Bob"), vec!["7", "9"]);
        assert_eq!(user_field_entries("a@x.com; b@x.com;"), vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_to_date() {
        let ctx = ctx();
        let date = ParamType::DateTime.coerce("2024-03-05T10:30:00Z");
        assert_eq!(run(to_date, &ctx, vec![date]), "2024-03-05T10:30:00Z");
        let bad = ParamType::DateTime.coerce("not a date");
        assert_eq!(run(to_date, &ctx, vec![bad]), "");
    }

    #[test]
    fn test_taxonomy_terms() {
        let ctx = ctx();
        let ids = format!("{}|not-a-guid|{}", TERM, Uuid::new_v4());
        assert_eq!(
            run(to_taxonomy_terms, &ctx, vec![s(&ids)]),
            format!("{{{{TermId:{}|News}}}}", TERM)
        );
    }

    #[test]
    fn test_default_taxonomy_keeps_existing_value() {
        let ctx = ctx();
        assert_eq!(
            run(default_taxonomy_field_value, &ctx, vec![s("News"), s(TERM), Arg::Bool(false)]),
            KEEP_EXISTING_VALUE
        );
        assert_eq!(
            run(default_taxonomy_field_value, &ctx, vec![s("News"), s(TERM), Arg::Bool(true)]),
            term_token(Uuid::parse_str(TERM).unwrap(), "News")
        );
        assert_eq!(
            run(default_taxonomy_field_value, &ctx, vec![s(""), s(TERM), Arg::Bool(false)]),
            term_token(Uuid::parse_str(TERM).unwrap(), "News")
        );
    }
}
