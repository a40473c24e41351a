//! List and view functions

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::param;
use crate::context::TransformationContext;
use crate::functions::coerce::{Args, ParamType};
use crate::functions::definition::FunctionOutput;
use crate::functions::registry::{BuiltinFunction, FunctionDoc, FunctionKind, FunctionResult};
use crate::source::{ListBaseType, ListInfo, list_template};
use crate::xml;

static CALENDAR_VIEW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bType\s*=\s*["']CALENDAR["']"#).expect("calendar pattern is valid")
});

/// List metadata through the run's lookup cache; failures are logged
pub(crate) fn lookup_list(ctx: &TransformationContext, id: Uuid) -> Option<ListInfo> {
    if id.is_nil() {
        return None;
    }
    match ctx
        .cache()
        .lists
        .get_or_try_insert_with(id, || ctx.source().list(id))
    {
        Ok(Some(list)) => Some(list),
        Ok(None) => {
            log::warn!("List {} was not found in '{}'", id, ctx.source_web().url);
            None
        }
        Err(e) => {
            log::warn!("Lookup of list {} failed: {}", id, e);
            None
        }
    }
}

fn list_cross_site_check(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let id = args.guid(0);
    if ctx.is_cross_site() {
        log::info!("List {} does not exist on the target site, dropping the reference", id);
        return Ok(FunctionOutput::Text(String::new()));
    }
    if id.is_nil() {
        return Ok(FunctionOutput::Text(String::new()));
    }
    Ok(id.to_string().into())
}

fn list_add_server_relative_url(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let Some(list) = lookup_list(ctx, args.guid(0)) else {
        return Ok(FunctionOutput::empty_map());
    };
    Ok(FunctionOutput::map([("ListServerRelativeUrl", list.server_relative_url)]))
}

fn list_add_web_relative_url(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let Some(list) = lookup_list(ctx, args.guid(0)) else {
        return Ok(FunctionOutput::empty_map());
    };
    let web = ctx.source_web().server_relative_url.trim_end_matches('/');
    let relative = if list
        .server_relative_url
        .to_ascii_lowercase()
        .starts_with(&web.to_ascii_lowercase())
    {
        list.server_relative_url[web.len()..].to_string()
    } else {
        list.server_relative_url.clone()
    };
    Ok(FunctionOutput::map([("ListWebRelativeUrl", relative)]))
}

fn list_hide_tool_bar(_: &TransformationContext, args: &Args) -> FunctionResult {
    Ok(args.text(0).trim().eq_ignore_ascii_case("None").into())
}

/// View whose query, fields and row limit match the web part's view, else the
/// list's default view
fn list_detect_used_view(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let Some(list) = lookup_list(ctx, args.guid(0)) else {
        return Ok(FunctionOutput::empty_map());
    };
    let view_xml = args.text(1);

    let matched = list
        .views
        .iter()
        .find(|view| xml::views_match(&view.xml, &view_xml));
    let view = match matched {
        Some(view) => view,
        None => {
            log::debug!("No view of list '{}' matches, using the default view", list.title);
            match list.default_view() {
                Some(view) => view,
                None => return Ok(FunctionOutput::empty_map()),
            }
        }
    };
    Ok(FunctionOutput::map([("ListViewId", view.id.to_string())]))
}

/// Classify a list for picking the target web part
fn list_selector_list_library(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    if CALENDAR_VIEW.is_match(&args.text(1)) {
        return Ok("Calendar".into());
    }

    let Some(list) = lookup_list(ctx, args.guid(0)) else {
        return Ok("Undefined".into());
    };

    let by_template = match list.base_template {
        list_template::EVENTS => Some("Calendar"),
        list_template::TASKS | list_template::TASKS_WITH_TIMELINE => Some("Task"),
        list_template::DISCUSSION_BOARD => Some("Discussion"),
        list_template::ISSUE_TRACKING => Some("Issue"),
        list_template::SURVEY => Some("Survey"),
        _ => None,
    };
    let kind = by_template.unwrap_or(match list.base_type {
        ListBaseType::DocumentLibrary => "Library",
        ListBaseType::GenericList => "List",
        ListBaseType::DiscussionBoard => "Discussion",
        ListBaseType::Survey => "Survey",
        ListBaseType::Issue => "Issue",
        ListBaseType::Unknown => "Undefined",
    });
    Ok(kind.into())
}

pub(super) const FUNCTIONS: &[BuiltinFunction] = &[
    BuiltinFunction {
        name: "ListCrossSiteCheck",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Keeps a list reference for same-site transformations and drops it when moving across sites.",
            example: "{ListId} = ListCrossSiteCheck({ListId})",
            params: &[param("listId", ParamType::Guid, "Id of the list")],
            returns: "The list id, or empty when the list does not exist on the target",
        },
        handler: list_cross_site_check,
    },
    BuiltinFunction {
        name: "ListAddServerRelativeUrl",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Adds the server relative url of a list.",
            example: "ListAddServerRelativeUrl({ListId})",
            params: &[param("listId", ParamType::Guid, "Id of the list")],
            returns: "ListServerRelativeUrl",
        },
        handler: list_add_server_relative_url,
    },
    BuiltinFunction {
        name: "ListAddWebRelativeUrl",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Adds the url of a list relative to its web.",
            example: "ListAddWebRelativeUrl({ListId})",
            params: &[param("listId", ParamType::Guid, "Id of the list")],
            returns: "ListWebRelativeUrl",
        },
        handler: list_add_web_relative_url,
    },
    BuiltinFunction {
        name: "ListHideToolBar",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Hides the command bar when the classic web part showed no toolbar.",
            example: "ListHideToolBar({XmlDefinition})",
            params: &[param("toolbarType", ParamType::String, "Toolbar type of the classic view")],
            returns: "true when the toolbar type is None",
        },
        handler: list_hide_tool_bar,
    },
    BuiltinFunction {
        name: "ListDetectUsedView",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Finds the list view with the same query, fields and row limit as the web part's view. Falls back to the default view.",
            example: "ListDetectUsedView({ListId},{XmlDefinition})",
            params: &[
                param("listId", ParamType::Guid, "Id of the list"),
                param("xmlView", ParamType::String, "View XML of the web part"),
            ],
            returns: "ListViewId",
        },
        handler: list_detect_used_view,
    },
    BuiltinFunction {
        name: "ListSelectorListLibrary",
        kind: FunctionKind::Selector,
        doc: FunctionDoc {
            description: "Classifies a list. Calendar views are recognized from the view XML before the list is looked up.",
            example: "ListSelectorListLibrary({ListId},{XmlDefinition})",
            params: &[
                param("listId", ParamType::Guid, "Id of the list"),
                param("viewXml", ParamType::String, "View XML of the web part"),
            ],
            returns: "Calendar, Task, Discussion, Issue, Survey, Library, List or Undefined",
        },
        handler: list_selector_list_library,
    },
];
