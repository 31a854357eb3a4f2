//! HTML output: one standalone page per module plus an index page.

use crate::comments::ParsedComment;
use crate::frontend::StorageClass;

use super::markdown::{html_escape, render_markdown};
use super::view::{
    EnumView, FunctionView, MacroView, PageView, RecordView, TypeView, TypedefView, VariableView,
};

const STYLE: &str = "\
body { font-family: system-ui, sans-serif; max-width: 56em; margin: 2em auto; padding: 0 1em; }
code { background: #f4f4f4; padding: 0.15em 0.3em; border-radius: 3px; }
pre { background: #f4f4f4; padding: 1em; border-radius: 5px; overflow-x: auto; }
table { border-collapse: collapse; margin: 0.5em 0 1em; }
th, td { text-align: left; padding: 0.25em 0.75em; border-bottom: 1px solid #e4e4e4; vertical-align: top; }
.hljs-keyword { color: #a626a4; }
.hljs-title { color: #4078f2; }
.hljs-params { color: #986801; }
.param-ref { color: #986801; }
.tag { display: inline-block; font-size: 0.75em; padding: 0.1em 0.4em; border-radius: 3px; margin-left: 0.5em; background: #e4e4e4; }
";

/// A module listed on the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub href: String,
    pub title: String,
}

fn head(out: &mut String, title: &str) {
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    out.push_str("<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", html_escape(title)));
    out.push_str("<style>\n");
    out.push_str(STYLE);
    out.push_str("</style>\n");
    out.push_str("</head>\n<body>\n");
}

fn foot(out: &mut String) {
    out.push_str("</body>\n</html>\n");
}

fn anchor(kind: &str, name: &str) -> String {
    let name: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!("{}-{}", kind, name)
}

pub fn render_page(page: &PageView) -> String {
    let mut out = String::new();
    let title = if page.module.is_empty() {
        page.project.clone()
    } else {
        format!("{}: {}", page.project, page.module)
    };
    head(&mut out, &title);

    out.push_str(&format!("<p><a href=\"index.html\">{}</a></p>\n", html_escape(&page.project)));
    out.push_str(&format!("<h1>{}</h1>\n", html_escape(&page.module)));
    if !page.documentation.is_empty() {
        out.push_str(&render_markdown(&page.documentation));
    }

    // Index
    out.push_str("<h2>Index</h2>\n<ul>\n");
    for ty in &page.types {
        index_item(&mut out, ty.type_string(), ty.name());
    }
    for function in &page.functions {
        index_item(&mut out, "function", &function.name);
    }
    for definition in &page.macros {
        index_item(&mut out, "macro", &definition.name);
    }
    for variable in &page.variables {
        index_item(&mut out, "variable", &variable.name);
    }
    out.push_str("</ul>\n");

    if !page.types.is_empty() {
        out.push_str("<h2>Types</h2>\n");
        for ty in &page.types {
            match ty {
                TypeView::Record(record) => render_record(&mut out, record),
                TypeView::Enum(enumeration) => render_enum(&mut out, enumeration),
                TypeView::Typedef(typedef) => render_typedef(&mut out, typedef),
            }
        }
    }

    if !page.functions.is_empty() {
        out.push_str("<h2>Functions</h2>\n");
        for function in &page.functions {
            render_function(&mut out, function);
        }
    }

    if !page.macros.is_empty() {
        out.push_str("<h2>Macros</h2>\n");
        for definition in &page.macros {
            render_macro(&mut out, definition);
        }
    }

    if !page.variables.is_empty() {
        out.push_str("<h2>Variables</h2>\n");
        for variable in &page.variables {
            render_variable(&mut out, variable);
        }
    }

    foot(&mut out);
    out
}

pub fn render_index(project: &str, modules: &[IndexEntry]) -> String {
    let mut out = String::new();
    head(&mut out, project);

    out.push_str(&format!("<h1>{}</h1>\n", html_escape(project)));
    out.push_str("<ul>\n");
    for module in modules {
        out.push_str(&format!(
            "  <li><a href=\"{}\">{}</a>",
            html_escape(&module.href),
            html_escape(&module.name)
        ));
        if !module.title.is_empty() && module.title != module.name {
            out.push_str(&format!(" {}", html_escape(&module.title)));
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ul>\n");

    foot(&mut out);
    out
}

fn index_item(out: &mut String, kind: &str, name: &str) {
    out.push_str(&format!(
        "  <li><a href=\"#{}\">{}</a> <span class=\"tag\">{}</span></li>\n",
        html_escape(&anchor(kind, name)),
        html_escape(name),
        kind
    ));
}

fn heading(out: &mut String, kind: &str, name: &str, tags: &[&str]) {
    out.push_str(&format!(
        "<h3 id=\"{}\">{}",
        html_escape(&anchor(kind, name)),
        html_escape(name)
    ));
    for tag in tags {
        out.push_str(&format!(" <span class=\"tag\">{}</span>", tag));
    }
    out.push_str("</h3>\n");
}

fn comment_html(out: &mut String, title: &str, body: &str) {
    if !title.is_empty() {
        out.push_str(&render_markdown(title));
    }
    if !body.is_empty() {
        out.push_str(&render_markdown(body));
    }
}

/// Description cell for a field or enum constant.
fn member_html(comment: &ParsedComment) -> String {
    let text = [comment.title.as_str(), comment.body.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    render_markdown(&text).trim_end().to_string()
}

fn render_record(out: &mut String, record: &RecordView) {
    let keyword = record.kind.keyword();
    let mut tags = vec![keyword];
    if record.anon_typedef {
        tags.push("typedef");
    }
    heading(out, keyword, &record.name, &tags);
    comment_html(out, &record.comment.title, &record.comment.body);

    if record.fields.is_empty() {
        return;
    }
    out.push_str("<table>\n<tr><th>Field</th><th>Type</th><th>Description</th></tr>\n");
    for field in &record.fields {
        out.push_str(&format!(
            "<tr><td><code>{}</code></td><td><code>{}</code></td><td>{}</td></tr>\n",
            html_escape(&field.name),
            field.ctype,
            member_html(&field.comment)
        ));
    }
    out.push_str("</table>\n");
}

fn render_enum(out: &mut String, enumeration: &EnumView) {
    let mut tags = vec!["enum"];
    if enumeration.anon_typedef {
        tags.push("typedef");
    }
    heading(out, "enum", &enumeration.name, &tags);
    comment_html(out, &enumeration.comment.title, &enumeration.comment.body);

    if enumeration.constants.is_empty() {
        return;
    }
    out.push_str("<table>\n<tr><th>Constant</th><th>Value</th><th>Description</th></tr>\n");
    for constant in &enumeration.constants {
        out.push_str(&format!(
            "<tr><td><code>{}</code></td><td>{}</td><td>{}</td></tr>\n",
            html_escape(&constant.name),
            constant.value,
            member_html(&constant.comment)
        ));
    }
    out.push_str("</table>\n");
}

fn render_typedef(out: &mut String, typedef: &TypedefView) {
    heading(out, "typedef", &typedef.name, &["typedef"]);
    out.push_str(&format!(
        "<pre><code><span class=\"hljs-keyword\">typedef</span> {} {};</code></pre>\n",
        html_escape(&typedef.underlying),
        html_escape(&typedef.name)
    ));
    comment_html(out, &typedef.comment.title, &typedef.comment.body);
}

fn render_function(out: &mut String, function: &FunctionView) {
    let mut tags = Vec::new();
    if function.storage_class == StorageClass::Static {
        tags.push("static");
    }
    if function.inlined {
        tags.push("inline");
    }
    heading(out, "function", &function.name, &tags);

    // Both already decorated and escaped.
    out.push_str(&format!(
        "<pre><code>{}{};</code></pre>\n",
        function.return_type, function.prototype
    ));
    comment_html(out, &function.comment.title, &function.comment.body);

    if !function.has_arg_docs {
        return;
    }
    out.push_str("<h4>Arguments</h4>\n<dl>\n");
    for arg in &function.args {
        out.push_str(&format!("  <dt><code>{}</code></dt>\n", html_escape(&arg.name)));
        out.push_str(&format!("  <dd>{}</dd>\n", arg.comment));
    }
    out.push_str("</dl>\n");
}

fn render_macro(out: &mut String, definition: &MacroView) {
    heading(out, "macro", &definition.name, &[]);
    let value = definition
        .value
        .as_deref()
        .map(|v| format!(" {}", html_escape(v)))
        .unwrap_or_default();
    out.push_str(&format!(
        "<pre><code><span class=\"hljs-keyword\">#define</span> {}{}</code></pre>\n",
        html_escape(&definition.signature),
        value
    ));
    comment_html(out, &definition.comment.title, &definition.comment.body);
}

fn render_variable(out: &mut String, variable: &VariableView) {
    let tags: Vec<&str> = match variable.storage_class {
        StorageClass::None => Vec::new(),
        other => vec![other.as_str()],
    };
    heading(out, "variable", &variable.name, &tags);
    out.push_str(&format!(
        "<pre><code><span class=\"hljs-keyword\">{}</span> {};</code></pre>\n",
        html_escape(&variable.ctype),
        html_escape(&variable.name)
    ));
    comment_html(out, &variable.comment.title, &variable.comment.body);
}
