//! Selectors picking the mapping variant of a web part

use super::param;
use super::rollup::summary_links;
use crate::config::extension_of;
use crate::context::TransformationContext;
use crate::functions::coerce::{Args, ParamType};
use crate::functions::registry::{BuiltinFunction, FunctionDoc, FunctionKind, FunctionResult};

fn content_embed_source_type(_: &TransformationContext, args: &Args) -> FunctionResult {
    let kind = match args.text(0).trim() {
        "2" | "3" => "ServerFolderOrFile",
        _ => "WebPage",
    };
    Ok(kind.into())
}

fn content_embed_content_link(_: &TransformationContext, args: &Args) -> FunctionResult {
    let link = args.text(0);
    let link = link.trim();
    let kind = if link.is_empty() {
        "Content"
    } else if extension_of(link).as_deref() == Some("aspx") {
        "ASPXLink"
    } else {
        "NonASPXLink"
    };
    Ok(kind.into())
}

fn content_by_query_selector(_: &TransformationContext, args: &Args) -> FunctionResult {
    let kind = if args.guid(0).is_nil() { "Site" } else { "List" };
    Ok(kind.into())
}

fn summary_link_selector(_: &TransformationContext, args: &Args) -> FunctionResult {
    let kind = if summary_links(&args.text(0)).is_empty() {
        "NoLinks"
    } else {
        "Links"
    };
    Ok(kind.into())
}

fn text_selector(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let text = args.text(0);
    let kind = if text.trim().is_empty() || ctx.html().is_empty_paragraph(&text) {
        "Empty"
    } else {
        "Text"
    };
    Ok(kind.into())
}

pub(super) const FUNCTIONS: &[BuiltinFunction] = &[
    BuiltinFunction {
        name: "ContentEmbedSelectorSourceType",
        kind: FunctionKind::Selector,
        doc: FunctionDoc {
            description: "Classifies what a page viewer web part shows.",
            example: "ContentEmbedSelectorSourceType({SourceType})",
            params: &[param("sourceType", ParamType::String, "Source type of the page viewer: 2 folder, 3 file, 4 web page")],
            returns: "WebPage or ServerFolderOrFile",
        },
        handler: content_embed_source_type,
    },
    BuiltinFunction {
        name: "ContentEmbedSelectorContentLink",
        kind: FunctionKind::Selector,
        doc: FunctionDoc {
            description: "Classifies a content editor by where its content comes from.",
            example: "ContentEmbedSelectorContentLink({ContentLink})",
            params: &[param("contentLink", ParamType::String, "Linked content file, if any")],
            returns: "Content, ASPXLink or NonASPXLink",
        },
        handler: content_embed_content_link,
    },
    BuiltinFunction {
        name: "ContentByQuerySelector",
        kind: FunctionKind::Selector,
        doc: FunctionDoc {
            description: "Tells whether a content by query web part targets one list or a whole site.",
            example: "ContentByQuerySelector({ListGuid})",
            params: &[param("listGuid", ParamType::Guid, "Queried list, if any")],
            returns: "List or Site",
        },
        handler: content_by_query_selector,
    },
    BuiltinFunction {
        name: "SummaryLinkSelector",
        kind: FunctionKind::Selector,
        doc: FunctionDoc {
            description: "Tells whether a summary link web part holds any links.",
            example: "SummaryLinkSelector({SummaryLinkStore})",
            params: &[param("summaryLinkData", ParamType::String, "Summary link store html")],
            returns: "Links or NoLinks",
        },
        handler: summary_link_selector,
    },
    BuiltinFunction {
        name: "TextSelector",
        kind: FunctionKind::Selector,
        doc: FunctionDoc {
            description: "Tells whether a text web part has visible content.",
            example: "TextSelector({Text})",
            params: &[param("text", ParamType::String, "Html of the text web part")],
            returns: "Text or Empty",
        },
        handler: text_selector,
    },
];
