//! View data: the model reshaped for one HTML page.

use std::collections::HashMap;

use crate::comments::ParsedComment;
use crate::frontend::StorageClass;
use crate::model::{Enum, Function, Macro, MacroFunction, Module, Struct, Typedef, Union, Variable};

use super::markdown::{html_escape, markup_param_refs};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub project: String,
    pub module: String,
    pub documentation: String,
    pub types: Vec<TypeView>,
    pub functions: Vec<FunctionView>,
    pub macros: Vec<MacroView>,
    pub variables: Vec<VariableView>,
}

/// Anything listed under "Types".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeView {
    Record(RecordView),
    Enum(EnumView),
    Typedef(TypedefView),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Struct,
    Union,
}

impl RecordKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            RecordKind::Struct => "struct",
            RecordKind::Union => "union",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
    pub kind: RecordKind,
    pub name: String,
    /// Named by the typedef that declares it.
    pub anon_typedef: bool,
    pub comment: ParsedComment,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub name: String,
    /// Decorated HTML
    pub ctype: String,
    pub comment: ParsedComment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumView {
    pub name: String,
    pub anon_typedef: bool,
    pub comment: ParsedComment,
    pub constants: Vec<ConstantView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantView {
    pub name: String,
    pub value: i64,
    pub comment: ParsedComment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedefView {
    pub name: String,
    pub underlying: String,
    pub comment: ParsedComment,
}

impl TypeView {
    pub fn name(&self) -> &str {
        match self {
            TypeView::Record(r) => &r.name,
            TypeView::Enum(e) => &e.name,
            TypeView::Typedef(t) => &t.name,
        }
    }

    pub fn is_anon_typedef(&self) -> bool {
        match self {
            TypeView::Record(r) => r.anon_typedef,
            TypeView::Enum(e) => e.anon_typedef,
            TypeView::Typedef(_) => false,
        }
    }

    pub fn type_string(&self) -> &'static str {
        match self {
            TypeView::Record(r) => r.kind.keyword(),
            TypeView::Enum(_) => "enum",
            TypeView::Typedef(_) => "typedef",
        }
    }

    /// Names an anonymous struct, union or enum after its typedef. Returns
    /// `false` if this type cannot take the name.
    fn adopt_typedef(&mut self, typedef: &Typedef) -> bool {
        let (name, anon_typedef, comment) = match self {
            TypeView::Record(r) => (&mut r.name, &mut r.anon_typedef, &mut r.comment),
            TypeView::Enum(e) => (&mut e.name, &mut e.anon_typedef, &mut e.comment),
            TypeView::Typedef(_) => return false,
        };
        if !name.is_empty() {
            return false;
        }
        *name = typedef.base.name.clone();
        *anon_typedef = true;
        if comment.is_empty() {
            *comment = ParsedComment::from_raw(&typedef.base.comment);
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionView {
    pub name: String,
    /// Title and body with parameter references marked up
    pub comment: ParsedComment,
    /// Decorated HTML, with a trailing space unless it ends in `*`
    pub return_type: String,
    /// Decorated HTML: `name(type arg, ...)`
    pub prototype: String,
    pub has_arg_docs: bool,
    pub args: Vec<ArgView>,
    pub inlined: bool,
    pub storage_class: StorageClass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgView {
    pub name: String,
    pub ctype: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroView {
    pub name: String,
    /// `NAME` or `NAME(a, b)`
    pub signature: String,
    pub value: Option<String>,
    pub comment: ParsedComment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableView {
    pub name: String,
    pub ctype: String,
    pub storage_class: StorageClass,
    pub comment: ParsedComment,
}

impl PageView {
    pub fn build(module: &Module, project: &str) -> Self {
        let mut types = Vec::new();
        let mut by_usr: HashMap<&str, usize> = HashMap::new();

        for (usr, record) in &module.structs {
            by_usr.insert(usr, types.len());
            types.push(TypeView::Record(struct_view(record)));
        }
        for (usr, record) in &module.unions {
            by_usr.insert(usr, types.len());
            types.push(TypeView::Record(union_view(record)));
        }
        for (usr, enumeration) in &module.enums {
            by_usr.insert(usr, types.len());
            types.push(TypeView::Enum(enum_view(enumeration)));
        }

        for typedef in module.typedefs.values() {
            let adopted = by_usr
                .get(typedef.base_type.base.usr.as_str())
                .map(|index| types[*index].adopt_typedef(typedef))
                .unwrap_or(false);
            if !adopted {
                types.push(TypeView::Typedef(typedef_view(typedef)));
            }
        }
        types.sort_by(|a, b| a.name().cmp(b.name()));

        let mut functions: Vec<FunctionView> = module.functions.values().map(function_view).collect();
        functions.sort_by(|a, b| a.name.cmp(&b.name));

        let mut macros: Vec<MacroView> = module
            .macros
            .values()
            .map(macro_view)
            .chain(module.macro_functions.values().map(macro_function_view))
            .collect();
        macros.sort_by(|a, b| a.name.cmp(&b.name));

        let mut variables: Vec<VariableView> = module.variables.values().map(variable_view).collect();
        variables.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            project: project.to_string(),
            module: module.name.clone(),
            documentation: module.documentation.clone(),
            types,
            functions,
            macros,
            variables,
        }
    }
}

// =====================================================
// Per-entity conversions
// =====================================================

fn decorate(text: &str, class: &str) -> String {
    format!("<span class=\"{}\">{}</span>", class, html_escape(text))
}

fn decorate_type(ctype: &str) -> String {
    decorate(ctype, "hljs-keyword")
}

fn is_pointer(ctype: &str) -> bool {
    ctype.ends_with('*')
}

fn field_views(fields: &[crate::model::Field]) -> Vec<FieldView> {
    fields
        .iter()
        .map(|field| FieldView {
            name: field.base.name.clone(),
            ctype: decorate_type(&field.ctype),
            comment: ParsedComment::from_raw(&field.base.comment),
        })
        .collect()
}

fn struct_view(record: &Struct) -> RecordView {
    RecordView {
        kind: RecordKind::Struct,
        name: record.base.name.clone(),
        anon_typedef: false,
        comment: ParsedComment::from_raw(&record.base.comment),
        fields: field_views(&record.fields),
    }
}

fn union_view(record: &Union) -> RecordView {
    RecordView {
        kind: RecordKind::Union,
        name: record.base.name.clone(),
        anon_typedef: false,
        comment: ParsedComment::from_raw(&record.base.comment),
        fields: field_views(&record.fields),
    }
}

fn enum_view(enumeration: &Enum) -> EnumView {
    EnumView {
        name: enumeration.base.name.clone(),
        anon_typedef: false,
        comment: ParsedComment::from_raw(&enumeration.base.comment),
        constants: enumeration
            .constants
            .iter()
            .map(|constant| ConstantView {
                name: constant.base.name.clone(),
                value: constant.value,
                comment: ParsedComment::from_raw(&constant.base.comment),
            })
            .collect(),
    }
}

fn typedef_view(typedef: &Typedef) -> TypedefView {
    TypedefView {
        name: typedef.base.name.clone(),
        underlying: typedef.base_type.base.name.clone(),
        comment: ParsedComment::from_raw(&typedef.base.comment),
    }
}

fn function_view(function: &Function) -> FunctionView {
    let mut comment = ParsedComment::from_raw(&function.base.comment);

    let mut return_type = decorate_type(&function.return_type);
    if !is_pointer(&function.return_type) {
        return_type.push(' ');
    }

    let mut arg_strings = Vec::new();
    let mut args = Vec::new();
    let mut has_arg_docs = false;

    for arg in &function.args {
        let mut ctype = decorate_type(&arg.ctype);
        if !is_pointer(&arg.ctype) {
            ctype.push(' ');
        }
        arg_strings.push(format!("{}{}", ctype, decorate(&arg.base.name, "hljs-params")));

        let description = comment.args.get(&arg.base.name);
        has_arg_docs |= description.is_some();
        args.push(ArgView {
            name: arg.base.name.clone(),
            ctype,
            comment: markup_param_refs(description.map(String::as_str).unwrap_or("")),
        });
    }

    let params = if args.is_empty() {
        decorate_type("void")
    } else {
        arg_strings.join(", ")
    };
    let prototype = format!("{}({})", decorate(&function.base.name, "hljs-title"), params);

    comment.title = markup_param_refs(&comment.title);
    comment.body = markup_param_refs(&comment.body);

    FunctionView {
        name: function.base.name.clone(),
        comment,
        return_type,
        prototype,
        has_arg_docs,
        args,
        inlined: function.inlined,
        storage_class: function.storage_class,
    }
}

fn macro_view(definition: &Macro) -> MacroView {
    MacroView {
        name: definition.base.name.clone(),
        signature: definition.base.name.clone(),
        value: Some(definition.value.clone()),
        comment: ParsedComment::from_raw(&definition.base.comment),
    }
}

fn macro_function_view(definition: &MacroFunction) -> MacroView {
    MacroView {
        name: definition.base.name.clone(),
        signature: format!("{}({})", definition.base.name, definition.args.join(", ")),
        value: None,
        comment: ParsedComment::from_raw(&definition.base.comment),
    }
}

fn variable_view(variable: &Variable) -> VariableView {
    VariableView {
        name: variable.base.name.clone(),
        ctype: variable.ctype.clone(),
        storage_class: variable.storage_class,
        comment: ParsedComment::from_raw(&variable.base.comment),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::extract::extract_source;

    fn page(source: &str) -> PageView {
        let extraction = extract_source(Path::new("view.h"), source, &[]).unwrap();
        PageView::build(&extraction.module, "Project")
    }

    #[test]
    fn test_anonymous_struct_takes_typedef_name() {
        let view = page("// An object.\ntypedef struct {\n  int type;  // Object type.\n} object_t;\n");
        assert_eq!(view.types.len(), 1);

        let TypeView::Record(record) = &view.types[0] else {
            panic!("expected a record");
        };
        assert_eq!(record.name, "object_t");
        assert!(record.anon_typedef);
        assert_eq!(record.comment.title, "An object.");
        assert_eq!(record.fields[0].comment.title, "Object type.");
    }

    #[test]
    fn test_named_struct_keeps_typedef_entry() {
        let view = page("typedef struct test {\n  int a;\n} test_t;\n");
        let names: Vec<&str> = view.types.iter().map(TypeView::name).collect();
        assert_eq!(names, vec!["test", "test_t"]);
        assert_eq!(view.types[1].type_string(), "typedef");
        assert!(!view.types[0].is_anon_typedef());
    }

    #[test]
    fn test_anonymous_enum_and_plain_typedef() {
        let view = page("typedef enum {\n  A,\n  B,\n} mode_t;\ntypedef unsigned int count_t;\n");
        let names: Vec<(&str, &str)> = view
            .types
            .iter()
            .map(|t| (t.name(), t.type_string()))
            .collect();
        assert_eq!(names, vec![("count_t", "typedef"), ("mode_t", "enum")]);
        let TypeView::Typedef(count) = &view.types[0] else {
            panic!("expected a typedef");
        };
        assert_eq!(count.underlying, "unsigned int");
    }

    #[test]
    fn test_function_prototype_and_arg_docs() {
        let view = page(
            "// Sets the priority.\n//\n// Args:\n//  t  Test.\n//  priority  New <priority>.\n//\n// Sets <t>.\nvoid set(test_t *t, int priority);\n",
        );
        let function = &view.functions[0];
        assert!(function.has_arg_docs);
        assert_eq!(
            function.return_type,
            "<span class=\"hljs-keyword\">void</span> "
        );
        assert_eq!(
            function.prototype,
            "<span class=\"hljs-title\">set</span>(\
             <span class=\"hljs-keyword\">test_t *</span><span class=\"hljs-params\">t</span>, \
             <span class=\"hljs-keyword\">int</span> <span class=\"hljs-params\">priority</span>)"
        );
        assert_eq!(function.args[0].comment, "Test.");
        assert!(function.args[1].comment.contains("param-ref"));
        assert!(function.comment.body.contains("<span class=\"param-ref\">t</span>"));
    }

    #[test]
    fn test_void_prototype() {
        let view = page("int *make(void);\n");
        let function = &view.functions[0];
        assert!(!function.has_arg_docs);
        assert_eq!(function.return_type, "<span class=\"hljs-keyword\">int *</span>");
        assert!(function.prototype.ends_with("(<span class=\"hljs-keyword\">void</span>)"));
    }

    #[test]
    fn test_sorted_sections() {
        let view = page("int zeta(void);\nint alpha(void);\n#define B 2\n#define A(x) (x)\n");
        let functions: Vec<&str> = view.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(functions, vec!["alpha", "zeta"]);
        let macros: Vec<&str> = view.macros.iter().map(|m| m.signature.as_str()).collect();
        assert_eq!(macros, vec!["A(x)", "B"]);
    }
}
