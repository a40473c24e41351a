//! Text and HTML functions

use super::param;
use crate::context::TransformationContext;
use crate::functions::coerce::{Args, ParamType};
use crate::functions::definition::FunctionOutput;
use crate::functions::registry::{BuiltinFunction, FunctionDoc, FunctionKind, FunctionResult, ParamDoc};
use crate::html;

fn html_encode(_: &TransformationContext, args: &Args) -> FunctionResult {
    Ok(html_escape::encode_quoted_attribute(&args.text(0)).into_owned().into())
}

/// Html encoding that survives being embedded in a JSON string
fn html_encode_for_json(_: &TransformationContext, args: &Args) -> FunctionResult {
    let encoded = html_escape::encode_quoted_attribute(&args.text(0))
        .replace("&quot;", "\\\"")
        .replace(':', "&#58;")
        .replace('@', "&#64;");
    Ok(encoded.into())
}

fn return_true(_: &TransformationContext, _: &Args) -> FunctionResult {
    Ok(true.into())
}

fn return_false(_: &TransformationContext, _: &Args) -> FunctionResult {
    Ok(false.into())
}

fn empty_string(_: &TransformationContext, _: &Args) -> FunctionResult {
    Ok(String::new().into())
}

fn static_string(_: &TransformationContext, args: &Args) -> FunctionResult {
    Ok(args.text(0).into_owned().into())
}

fn concatenate(_: &TransformationContext, args: &Args) -> FunctionResult {
    Ok(format!("{}{}", args.text(0), args.text(1)).into())
}

fn join_non_empty(a: &str, b: &str, delimiter: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (false, false) => format!("{}{}{}", a, delimiter, b),
        (true, _) => b.to_string(),
        (false, true) => a.to_string(),
    }
}

fn concatenate_semicolon(_: &TransformationContext, args: &Args) -> FunctionResult {
    Ok(join_non_empty(&args.text(0), &args.text(1), ";").into())
}

fn concatenate_pipe(_: &TransformationContext, args: &Args) -> FunctionResult {
    Ok(join_non_empty(&args.text(0), &args.text(1), "|").into())
}

fn prefix(_: &TransformationContext, args: &Args) -> FunctionResult {
    let value = args.text(1);
    if value.is_empty() && !args.bool(2) {
        return Ok(FunctionOutput::Text(String::new()));
    }
    Ok(format!("{}{}", args.text(0), value).into())
}

fn suffix(_: &TransformationContext, args: &Args) -> FunctionResult {
    let value = args.text(1);
    if value.is_empty() && !args.bool(2) {
        return Ok(FunctionOutput::Text(String::new()));
    }
    Ok(format!("{}{}", value, args.text(0)).into())
}

fn prefix_and_suffix(_: &TransformationContext, args: &Args) -> FunctionResult {
    let value = args.text(2);
    if value.is_empty() && !args.bool(3) {
        return Ok(FunctionOutput::Text(String::new()));
    }
    Ok(format!("{}{}{}", args.text(0), value, args.text(1)).into())
}

/// Rewrite links, then normalize for the modern text model
fn text_cleanup(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    let text = args.text(0);
    if text.trim().is_empty() {
        return Ok(FunctionOutput::Text(String::new()));
    }

    let rewritten = if ctx.settings().skip_url_rewrite {
        text.into_owned()
    } else {
        ctx.url_mapper().map_url(&text)
    };

    let cleaned = ctx.html().transform(&rewritten, args.bool(1));
    if ctx.html().is_empty_paragraph(&cleaned) {
        return Ok(FunctionOutput::Text(String::new()));
    }
    Ok(cleaned.into())
}

fn contains_script(_: &TransformationContext, args: &Args) -> FunctionResult {
    Ok(html::contains_script(&args.text(0)).into())
}

const VALUE: &[ParamDoc] = &[param("value", ParamType::String, "Text to process")];

const TWO_VALUES: &[ParamDoc] = &[
    param("value1", ParamType::String, "First value"),
    param("value2", ParamType::String, "Second value"),
];

pub(super) const FUNCTIONS: &[BuiltinFunction] = &[
    BuiltinFunction {
        name: "HtmlEncode",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Html encodes a string.",
            example: "HtmlEncode({Title})",
            params: VALUE,
            returns: "Html encoded string",
        },
        handler: html_encode,
    },
    BuiltinFunction {
        name: "HtmlEncodeForJson",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Html encodes a string for inclusion in JSON: quotes are escaped and colons and at-signs become character references.",
            example: "HtmlEncodeForJson({Title})",
            params: VALUE,
            returns: "Html encoded string safe for JSON properties",
        },
        handler: html_encode_for_json,
    },
    BuiltinFunction {
        name: "ReturnTrue",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Returns true.",
            example: "ReturnTrue()",
            params: &[],
            returns: "true",
        },
        handler: return_true,
    },
    BuiltinFunction {
        name: "ReturnFalse",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Returns false.",
            example: "ReturnFalse()",
            params: &[],
            returns: "false",
        },
        handler: return_false,
    },
    BuiltinFunction {
        name: "EmptyString",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Returns an empty string.",
            example: "EmptyString()",
            params: &[],
            returns: "Empty string",
        },
        handler: empty_string,
    },
    BuiltinFunction {
        name: "StaticString",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Returns the given string unchanged. Use it to assign a fixed value.",
            example: "StaticString('Hello world')",
            params: &[param("value", ParamType::String, "Static value to return")],
            returns: "The given string",
        },
        handler: static_string,
    },
    BuiltinFunction {
        name: "Concatenate",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Concatenates two strings.",
            example: "{CombinedTitle} = Concatenate({Title},{SubTitle})",
            params: TWO_VALUES,
            returns: "Both values joined",
        },
        handler: concatenate,
    },
    BuiltinFunction {
        name: "ConcatenateWithSemiColonDelimiter",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Concatenates two strings with a semicolon in between. The delimiter is left out when either value is empty.",
            example: "{Users} = ConcatenateWithSemiColonDelimiter({Owners},{Members})",
            params: TWO_VALUES,
            returns: "Both values joined by ';'",
        },
        handler: concatenate_semicolon,
    },
    BuiltinFunction {
        name: "ConcatenateWithPipeDelimiter",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Concatenates two strings with a pipe in between. The delimiter is left out when either value is empty.",
            example: "{Terms} = ConcatenateWithPipeDelimiter({Term1},{Term2})",
            params: TWO_VALUES,
            returns: "Both values joined by '|'",
        },
        handler: concatenate_pipe,
    },
    BuiltinFunction {
        name: "Prefix",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Prefixes a value. Empty values stay empty unless prefixIfEmpty is true.",
            example: "Prefix('<h2>About</h2>',{Text},'false')",
            params: &[
                param("prefix", ParamType::String, "Text to put in front"),
                param("value", ParamType::String, "Value to prefix"),
                param("prefixIfEmpty", ParamType::Bool, "Also prefix when the value is empty"),
            ],
            returns: "Prefixed value",
        },
        handler: prefix,
    },
    BuiltinFunction {
        name: "Suffix",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Suffixes a value. Empty values stay empty unless suffixIfEmpty is true.",
            example: "Suffix('<p>More info</p>',{Text},'false')",
            params: &[
                param("suffix", ParamType::String, "Text to append"),
                param("value", ParamType::String, "Value to suffix"),
                param("suffixIfEmpty", ParamType::Bool, "Also suffix when the value is empty"),
            ],
            returns: "Suffixed value",
        },
        handler: suffix,
    },
    BuiltinFunction {
        name: "PrefixAndSuffix",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Wraps a value between a prefix and a suffix. Empty values stay empty unless applyIfEmpty is true.",
            example: "PrefixAndSuffix('<div>','</div>',{Text},'false')",
            params: &[
                param("prefix", ParamType::String, "Text to put in front"),
                param("suffix", ParamType::String, "Text to append"),
                param("value", ParamType::String, "Value to wrap"),
                param("applyIfEmpty", ParamType::Bool, "Also wrap when the value is empty"),
            ],
            returns: "Wrapped value",
        },
        handler: prefix_and_suffix,
    },
    BuiltinFunction {
        name: "TextCleanup",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Rewrites links to the target site and rewrites the html so it fits the modern text editor.",
            example: "TextCleanup({Text},{UsePlaceHolders})",
            params: &[
                param("text", ParamType::String, "Html to clean"),
                param("usePlaceHolders", ParamType::Bool, "Leave a placeholder for images and embeds that cannot be kept"),
            ],
            returns: "Cleaned html, empty when nothing visible remains",
        },
        handler: text_cleanup,
    },
    BuiltinFunction {
        name: "ContainsScript",
        kind: FunctionKind::Function,
        doc: FunctionDoc {
            description: "Checks whether html contains script tags. Html that cannot be read counts as script free.",
            example: "{HasScript} = ContainsScript({Content})",
            params: &[param("html", ParamType::String, "Html to check")],
            returns: "true when a script element is present",
        },
        handler: contains_script,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformSettings;
    use crate::functions::coerce::Arg;
    use crate::source::{InMemorySource, WebInfo};
    use std::sync::Arc;

    fn ctx() -> TransformationContext {
        TransformationContext::new(
            Arc::new(InMemorySource::new("https://contoso.sharepoint.com/sites/a")),
            TransformSettings::default(),
        )
    }

    fn args(values: &[&str]) -> Args {
        Args::new(values.iter().map(|v| Arg::String(v.to_string())).collect())
    }

    fn text(out: FunctionResult) -> String {
        out.unwrap().as_scalar().unwrap()
    }

    #[test]
    fn test_html_encode() {
        assert_eq!(text(html_encode(&ctx(), &args(&["A & B"]))), "A &amp; B");
        assert_eq!(text(html_encode(&ctx(), &args(&["<b>\"x\"</b>"]))), "&lt;b&gt;&quot;x&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_html_encode_for_json() {
        assert_eq!(
            text(html_encode_for_json(&ctx(), &args(&["say \"hi\" to a@b: now"]))),
            "say \\\"hi\\\" to a&#64;b&#58; now"
        );
    }

    #[test]
    fn test_concatenate_variants() {
        assert_eq!(text(concatenate(&ctx(), &args(&["a", "b"]))), "ab");
        assert_eq!(text(concatenate_semicolon(&ctx(), &args(&["a", "b"]))), "a;b");
        assert_eq!(text(concatenate_semicolon(&ctx(), &args(&["", "b"]))), "b");
        assert_eq!(text(concatenate_pipe(&ctx(), &args(&["a", ""]))), "a");
    }

    #[test]
    fn test_prefix_and_suffix() {
        assert_eq!(text(prefix(&ctx(), &args(&["<h2>", "x", "false"]))), "<h2>x");
        assert_eq!(text(prefix(&ctx(), &args(&["<h2>", "", "false"]))), "");
        assert_eq!(text(prefix(&ctx(), &args(&["<h2>", "", "true"]))), "<h2>");
        assert_eq!(text(suffix(&ctx(), &args(&["!", "x", "false"]))), "x!");
        assert_eq!(
            text(prefix_and_suffix(&ctx(), &args(&["<p>", "</p>", "x", "false"]))),
            "<p>x</p>"
        );
        assert_eq!(text(prefix_and_suffix(&ctx(), &args(&["<p>", "</p>", "", "false"]))), "");
    }

    #[test]
    fn test_text_cleanup_rewrites_links() {
        let ctx = ctx().with_target(WebInfo::new("https://contoso.sharepoint.com/sites/b"));
        let out = text(text_cleanup(
            &ctx,
            &args(&[r#"<p><a href="/sites/a/Pages/x.aspx">x</a></p>"#, "false"]),
        ));
        assert_eq!(out, r#"<p><a href="/sites/b/Pages/x.aspx">x</a></p>"#);
    }

    #[test]
    fn test_text_cleanup_honors_skip_url_rewrite() {
        let settings = TransformSettings {
            skip_url_rewrite: true,
            ..Default::default()
        };
        let ctx = TransformationContext::new(
            Arc::new(InMemorySource::new("https://contoso.sharepoint.com/sites/a")),
            settings,
        )
        .with_target(WebInfo::new("https://contoso.sharepoint.com/sites/b"));
        let html = r#"<p><a href="/sites/a/x.aspx">x</a></p>"#;
        assert_eq!(text(text_cleanup(&ctx, &args(&[html, "false"]))), html);
    }

    #[test]
    fn test_text_cleanup_empty_paragraph() {
        assert_eq!(text(text_cleanup(&ctx(), &args(&["<p>&nbsp;</p>", "false"]))), "");
    }

    #[test]
    fn test_contains_script() {
        assert_eq!(contains_script(&ctx(), &args(&["<p>hi</p>"])).unwrap(), FunctionOutput::Bool(false));
        assert_eq!(
            contains_script(&ctx(), &args(&["<script>x</script>"])).unwrap(),
            FunctionOutput::Bool(true)
        );
    }
}
