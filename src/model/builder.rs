use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::{
    Base, Basic, Container, Entity, EnumConstant, Field, FunctionNode, Macro, MacroFunction,
    ModelGraph, ObjectType, Param, Typedef, Variable,
};
use crate::comments::CommentIndex;
use crate::error::{DocError, Result};
use crate::frontend::{CursorId, CursorKind, TranslationUnit};

static MACRO_ARGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*(.*?)\s*\)").unwrap());
static ARG_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,\s*").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Walks the cursor tree of one translation unit and collects the entities
/// declared in its main file.
pub struct ModelBuilder<'a> {
    unit: &'a TranslationUnit,
    comments: &'a CommentIndex,
    graph: ModelGraph,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(unit: &'a TranslationUnit, comments: &'a CommentIndex) -> Self {
        Self {
            unit,
            comments,
            graph: ModelGraph::new(),
        }
    }

    pub fn build(mut self) -> Result<ModelGraph> {
        self.visit(self.unit.root(), 0)?;
        Ok(self.graph)
    }

    fn visit(&mut self, parent: CursorId, depth: usize) -> Result<()> {
        let unit = self.unit;
        for &child in unit.children(parent) {
            if !unit.is_from_main_file(child) {
                continue;
            }

            let cursor = unit.cursor(child);
            trace!(
                "{}{}: {} ({}) [{}]",
                "  ".repeat(depth),
                cursor.kind.spelling(),
                cursor.spelling,
                cursor.usr,
                unit.cursor(parent).kind.spelling()
            );

            if self.handle(unit.canonical(child), parent)? {
                self.visit(child, depth + 1)?;
            }
        }
        Ok(())
    }

    /// Creates the entity for `id` unless one already exists. Returns whether
    /// the walk should descend into the cursor's children.
    fn handle(&mut self, id: CursorId, parent: CursorId) -> Result<bool> {
        let cursor = self.unit.cursor(id);
        if self.graph.contains(&cursor.usr) {
            return Ok(false);
        }

        match cursor.kind {
            CursorKind::StructDecl => {
                let base = self.base(id, ObjectType::Struct);
                self.graph.insert(Entity::Struct(Container {
                    base,
                    members: Vec::new(),
                }));
                Ok(true)
            }
            CursorKind::UnionDecl => {
                let base = self.base(id, ObjectType::Union);
                self.graph.insert(Entity::Union(Container {
                    base,
                    members: Vec::new(),
                }));
                Ok(true)
            }
            CursorKind::EnumDecl => {
                let base = self.base(id, ObjectType::Enum);
                self.graph.insert(Entity::Enum(Container {
                    base,
                    members: Vec::new(),
                }));
                Ok(true)
            }
            CursorKind::FieldDecl => {
                let field = Field {
                    base: self.base(id, ObjectType::Field),
                    ctype: canonical_ctype(cursor.type_spelling()),
                };
                let parent_usr = self.parent_usr(parent);
                self.graph.insert_child(parent_usr, Entity::Field(field))?;
                Ok(false)
            }
            CursorKind::EnumConstantDecl => {
                let constant = EnumConstant {
                    base: self.base(id, ObjectType::EnumConstant),
                    value: cursor.enum_constant_value(),
                };
                let parent_usr = self.parent_usr(parent);
                self.graph
                    .insert_child(parent_usr, Entity::EnumConstant(constant))?;
                Ok(false)
            }
            CursorKind::ParmDecl => {
                let param = Param {
                    base: self.base(id, ObjectType::Param),
                    ctype: canonical_ctype(cursor.type_spelling()),
                };
                let parent_usr = self.parent_usr(parent);
                self.graph.insert_child(parent_usr, Entity::Param(param))?;
                Ok(false)
            }
            CursorKind::FunctionDecl => {
                let function = FunctionNode {
                    base: self.base(id, ObjectType::Function),
                    storage_class: cursor.storage_class(),
                    inlined: cursor.is_function_inlined(),
                    return_type: canonical_ctype(cursor.result_type()),
                    params: Vec::new(),
                };
                self.graph.insert(Entity::Function(function));
                Ok(true)
            }
            CursorKind::VarDecl => {
                let variable = Variable {
                    base: self.base(id, ObjectType::Variable),
                    ctype: canonical_ctype(cursor.type_spelling()),
                    storage_class: cursor.storage_class(),
                };
                self.graph.insert(Entity::Variable(variable));
                Ok(false)
            }
            CursorKind::TypedefDecl => {
                // Anonymous underlying types are matched to the typedef when
                // rendering, not here.
                let underlying = cursor.typedef_underlying_type();
                let typedef = Typedef {
                    base: self.base(id, ObjectType::Typedef),
                    base_type: Basic {
                        base: Base {
                            name: underlying.spelling,
                            object_type: ObjectType::Basic,
                            comment: String::new(),
                            usr: underlying.declaration_usr,
                            file: String::new(),
                            line: 0,
                            column: 0,
                        },
                    },
                };
                self.graph.insert(Entity::Typedef(typedef));
                Ok(true)
            }
            CursorKind::MacroDefinition => {
                self.macro_definition(id)?;
                Ok(false)
            }
            CursorKind::TranslationUnit | CursorKind::ClassDecl | CursorKind::Namespace => Ok(false),
        }
    }

    fn macro_definition(&mut self, id: CursorId) -> Result<()> {
        let cursor = self.unit.cursor(id);
        let content = self.unit.extent_contents(id)?;

        if cursor.is_macro_function_like() {
            let captures = MACRO_ARGS
                .captures(&content)
                .ok_or_else(|| DocError::MalformedMacro {
                    name: cursor.spelling.clone(),
                    text: content.clone(),
                })?;
            let args = ARG_SPLIT
                .split(&captures[1])
                .filter(|arg| !arg.is_empty())
                .map(str::to_string)
                .collect();

            let base = self.base(id, ObjectType::MacroFunction);
            self.graph
                .insert(Entity::MacroFunction(MacroFunction { base, args }));
            return Ok(());
        }

        let mut parts = WHITESPACE.splitn(&content, 2);
        let _name = parts.next();
        match parts.next() {
            Some(value) => {
                let base = self.base(id, ObjectType::Macro);
                self.graph.insert(Entity::Macro(Macro {
                    base,
                    value: value.to_string(),
                }));
            }
            None => trace!("Dropping macro without value: {}", cursor.spelling),
        }
        Ok(())
    }

    fn base(&self, id: CursorId, object_type: ObjectType) -> Base {
        let cursor = self.unit.cursor(id);
        Base {
            name: cursor.spelling.clone(),
            object_type,
            comment: self.comments.find(&cursor.usr).to_string(),
            usr: cursor.usr.clone(),
            file: cursor.location.file.to_string(),
            line: cursor.location.line,
            column: cursor.location.column,
        }
    }

    fn parent_usr(&self, parent: CursorId) -> &'a str {
        let unit = self.unit;
        &unit.cursor(unit.canonical(parent)).usr
    }
}

/// Spelling of a C type as it should appear in the model.
pub fn canonical_ctype(spelling: &str) -> String {
    match spelling {
        "_Bool" => "bool".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use std::sync::Arc;

    use super::*;
    use crate::frontend::{
        CppFrontEnd, Cursor, CursorDetail, FrontEnd, SourceLocation, SourceRange, StorageClass,
    };
    use crate::model::Module;

    fn build(source: &str) -> Result<Module> {
        let unit = CppFrontEnd::new().parse_source(Path::new("model.h"), source, &[])?;
        let comments = CommentIndex::build(&unit);
        let graph = ModelBuilder::new(&unit, &comments).build()?;
        Ok(graph.into_module(String::new(), String::new(), unit.main_file().to_string()))
    }

    fn hand_built(source: &str, cursors: Vec<Cursor>) -> TranslationUnit {
        let mut unit = TranslationUnit::new(Arc::from("hand.h"), source.to_string());
        for cursor in cursors {
            unit.push_cursor(CursorId::ROOT, cursor);
        }
        unit
    }

    fn cursor(kind: CursorKind, name: &str, start: usize, end: usize, detail: CursorDetail) -> Cursor {
        let at = |offset: usize| SourceLocation {
            file: Arc::from("hand.h"),
            line: 1,
            column: offset as u32 + 1,
            offset,
        };
        Cursor {
            kind,
            spelling: name.to_string(),
            usr: format!("c:hand.h@{}", name),
            location: at(start),
            extent: SourceRange {
                start: at(start),
                end: at(end),
            },
            parent: None,
            children: Vec::new(),
            detail,
        }
    }

    #[test]
    fn test_function_like_macro_without_parens_is_malformed() {
        let unit = hand_built(
            "#define FOO bar\n",
            vec![cursor(
                CursorKind::MacroDefinition,
                "FOO",
                8,
                15,
                CursorDetail::Macro { function_like: true },
            )],
        );
        let comments = CommentIndex::build(&unit);

        let result = ModelBuilder::new(&unit, &comments).build();
        match result {
            Err(DocError::MalformedMacro { name, text }) => {
                assert_eq!(name, "FOO");
                assert_eq!(text, "FOO bar");
            }
            other => panic!("expected MalformedMacro, got {:?}", other),
        }
    }

    #[test]
    fn test_field_without_record_aborts_build() {
        let unit = hand_built(
            "int a;\n",
            vec![cursor(
                CursorKind::FieldDecl,
                "a",
                4,
                5,
                CursorDetail::Typed {
                    ctype: "int".to_string(),
                    storage_class: StorageClass::None,
                },
            )],
        );
        let comments = CommentIndex::build(&unit);

        let result = ModelBuilder::new(&unit, &comments).build();
        assert!(matches!(result, Err(DocError::StructuralViolation(_))));
    }

    #[test]
    fn test_struct_fields_in_order() {
        let module = build("struct point {\n  int z;\n  int x;\n  int y;\n};\n").unwrap();
        let point = &module.structs["c:@S@point"];
        let names: Vec<&str> = point.fields.iter().map(|f| f.base.name.as_str()).collect();
        assert_eq!(names, vec!["z", "x", "y"]);
        assert_eq!(point.fields[0].base.object_type, ObjectType::Field);
    }

    #[test]
    fn test_forward_declaration_wins() {
        let module = build("// Forward.\nstruct s;\n\n// Defined.\nstruct s {\n  int a;\n};\n").unwrap();
        assert_eq!(module.structs.len(), 1);
        let s = &module.structs["c:@S@s"];
        // Comments follow the canonical USR, members come from the first visit.
        assert_eq!(s.base.comment, "// Defined.");
        assert!(s.fields.is_empty());
    }

    #[test]
    fn test_function_redeclaration_keeps_first_params() {
        let module = build("int f(int a);\nint f(int b) { return b; }\n").unwrap();
        assert_eq!(module.functions.len(), 1);
        let f = &module.functions["c:@F@f"];
        assert_eq!(f.args.len(), 1);
        assert_eq!(f.args[0].base.name, "a");
        assert_eq!(f.return_type, "int");
    }

    #[test]
    fn test_function_like_macro_args() {
        let module = build("#define FOO(a, b) ((a)+(b))\n#define NONE() 0\n").unwrap();
        let foo = module
            .macro_functions
            .values()
            .find(|m| m.base.name == "FOO")
            .unwrap();
        assert_eq!(foo.args, vec!["a".to_string(), "b".to_string()]);

        let none = module
            .macro_functions
            .values()
            .find(|m| m.base.name == "NONE")
            .unwrap();
        assert!(none.args.is_empty());
    }

    #[test]
    fn test_object_like_macro_without_value_is_dropped() {
        let module = build("#define FLAG\n#define VALUE (1 << 5)\n").unwrap();
        assert_eq!(module.macros.len(), 1);
        let value = module.macros.values().next().unwrap();
        assert_eq!(value.base.name, "VALUE");
        assert_eq!(value.value, "(1 << 5)");
    }

    #[test]
    fn test_typedef_captures_underlying_type() {
        let module = build("typedef union {\n  int i;\n  float f;\n} value_t;\ntypedef int count_t;\n").unwrap();
        let value_t = &module.typedefs["c:model.h@T@value_t"];
        assert_eq!(value_t.base_type.base.usr, "c:@UA@value_t");
        assert_eq!(value_t.base_type.base.object_type, ObjectType::Basic);

        let union = &module.unions["c:@UA@value_t"];
        assert_eq!(union.base.name, "");
        assert_eq!(union.fields.len(), 2);

        let count_t = &module.typedefs["c:model.h@T@count_t"];
        assert_eq!(count_t.base_type.base.name, "int");
        assert_eq!(count_t.base_type.base.usr, "");
    }

    #[test]
    fn test_bool_is_canonicalized() {
        let module = build("_Bool ready;\nint check(_Bool strict);\n").unwrap();
        assert_eq!(module.variables["c:@ready"].ctype, "bool");
        assert_eq!(module.functions["c:@F@check"].args[0].ctype, "bool");
    }

    #[test]
    fn test_enum_constants_and_comments() {
        let module = build("enum mode {\n  // Off.\n  MODE_OFF,\n  MODE_ON = 4,  // On.\n};\n").unwrap();
        let mode = &module.enums["c:@E@mode"];
        let constants: Vec<(&str, i64, &str)> = mode
            .constants
            .iter()
            .map(|c| (c.base.name.as_str(), c.value, c.base.comment.as_str()))
            .collect();
        assert_eq!(
            constants,
            vec![("MODE_OFF", 0, "// Off."), ("MODE_ON", 4, "// On.")]
        );
    }

    #[test]
    fn test_variable_storage_class() {
        let module = build("extern int shared;\nstatic const char *name;\n").unwrap();
        let shared = &module.variables["c:@shared"];
        assert_eq!(shared.storage_class, crate::frontend::StorageClass::Extern);
        let name = &module.variables["c:model.h@name"];
        assert_eq!(name.ctype, "const char *");
        assert_eq!(name.storage_class, crate::frontend::StorageClass::Static);
    }

    #[test]
    fn test_canonical_ctype() {
        assert_eq!(canonical_ctype("_Bool"), "bool");
        assert_eq!(canonical_ctype("int *"), "int *");
    }
}
