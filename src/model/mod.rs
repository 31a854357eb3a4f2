//! The documentation model.
//!
//! During extraction every entity lives in one [`ModelGraph`] keyed by USR,
//! with parents referring to their children by key. Once the walk is done the
//! graph is folded into a [`Module`], the nested structure that gets
//! serialized and rendered.

pub mod builder;

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DocError, Result};
use crate::frontend::StorageClass;

pub use builder::ModelBuilder;

/// Canonical identity of a declaration.
pub type Usr = String;

// =====================================================
// Entities
// =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Struct,
    Union,
    Enum,
    Field,
    EnumConstant,
    Function,
    Variable,
    Param,
    Typedef,
    Macro,
    MacroFunction,
    Basic,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Struct => "struct",
            ObjectType::Union => "union",
            ObjectType::Enum => "enum",
            ObjectType::Field => "field",
            ObjectType::EnumConstant => "enum_constant",
            ObjectType::Function => "function",
            ObjectType::Variable => "variable",
            ObjectType::Param => "param",
            ObjectType::Typedef => "typedef",
            ObjectType::Macro => "macro",
            ObjectType::MacroFunction => "macro_function",
            ObjectType::Basic => "basic",
        }
    }
}

/// Attributes shared by every entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    /// Raw comment text, markers included
    #[serde(default)]
    pub comment: String,
    pub usr: Usr,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default, rename = "col")]
    pub column: u32,
}

/// A type reference by spelling and USR of its declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basic {
    #[serde(flatten)]
    pub base: Base,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Struct {
    #[serde(flatten)]
    pub base: Base,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Union {
    #[serde(flatten)]
    pub base: Base,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enum {
    #[serde(flatten)]
    pub base: Base,
    #[serde(default)]
    pub constants: Vec<EnumConstant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(flatten)]
    pub base: Base,
    pub ctype: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumConstant {
    #[serde(flatten)]
    pub base: Base,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    #[serde(flatten)]
    pub base: Base,
    pub storage_class: StorageClass,
    pub inlined: bool,
    #[serde(default)]
    pub args: Vec<Param>,
    pub return_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    #[serde(flatten)]
    pub base: Base,
    pub ctype: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Typedef {
    #[serde(flatten)]
    pub base: Base,
    pub base_type: Basic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    #[serde(flatten)]
    pub base: Base,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroFunction {
    #[serde(flatten)]
    pub base: Base,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(flatten)]
    pub base: Base,
    pub ctype: String,
    pub storage_class: StorageClass,
}

/// A struct, union or enum while its members are still being collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub base: Base,
    pub members: Vec<Usr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionNode {
    pub base: Base,
    pub storage_class: StorageClass,
    pub inlined: bool,
    pub return_type: String,
    pub params: Vec<Usr>,
}

/// Every kind of entity the model knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Struct(Container),
    Union(Container),
    Enum(Container),
    Function(FunctionNode),
    Field(Field),
    EnumConstant(EnumConstant),
    Param(Param),
    Typedef(Typedef),
    Macro(Macro),
    MacroFunction(MacroFunction),
    Variable(Variable),
}

impl Entity {
    pub fn base(&self) -> &Base {
        match self {
            Entity::Struct(c) | Entity::Union(c) | Entity::Enum(c) => &c.base,
            Entity::Function(f) => &f.base,
            Entity::Field(f) => &f.base,
            Entity::EnumConstant(c) => &c.base,
            Entity::Param(p) => &p.base,
            Entity::Typedef(t) => &t.base,
            Entity::Macro(m) => &m.base,
            Entity::MacroFunction(m) => &m.base,
            Entity::Variable(v) => &v.base,
        }
    }

    pub fn usr(&self) -> &str {
        &self.base().usr
    }

    pub fn object_type(&self) -> ObjectType {
        self.base().object_type
    }
}

// =====================================================
// Model graph
// =====================================================

/// All entities of one extraction, in creation order.
#[derive(Debug, Default)]
pub struct ModelGraph {
    entities: IndexMap<Usr, Entity>,
}

impl ModelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, usr: &str) -> bool {
        self.entities.contains_key(usr)
    }

    pub fn get(&self, usr: &str) -> Option<&Entity> {
        self.entities.get(usr)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Inserts an entity that has no parent. Returns `false` if the key was
    /// already taken, leaving the existing entity untouched.
    pub fn insert(&mut self, entity: Entity) -> bool {
        let usr = entity.usr().to_string();
        if self.entities.contains_key(&usr) {
            return false;
        }
        self.entities.insert(usr, entity);
        true
    }

    /// Inserts a field, enum constant or parameter and appends it to the
    /// member list of `parent`.
    pub fn insert_child(&mut self, parent: &str, entity: Entity) -> Result<bool> {
        let child_type = entity.object_type();
        let usr = entity.usr().to_string();
        let duplicate = self.entities.contains_key(&usr);

        let members = match (self.entities.get_mut(parent), &entity) {
            (Some(Entity::Struct(c)), Entity::Field(_))
            | (Some(Entity::Union(c)), Entity::Field(_))
            | (Some(Entity::Enum(c)), Entity::EnumConstant(_)) => &mut c.members,
            (Some(Entity::Function(f)), Entity::Param(_)) => &mut f.params,
            (found, _) => {
                let found = found
                    .map(|e| e.object_type().as_str())
                    .unwrap_or("nothing");
                return Err(DocError::StructuralViolation(format!(
                    "{} '{}' has parent '{}' which is {}",
                    child_type.as_str(),
                    entity.base().name,
                    parent,
                    found
                )));
            }
        };

        if duplicate {
            return Ok(false);
        }
        members.push(usr.clone());
        self.entities.insert(usr, entity);
        Ok(true)
    }

    /// Folds the graph into the serialized module layout.
    pub fn into_module(self, name: String, documentation: String, file: String) -> Module {
        let mut module = Module {
            name,
            documentation,
            file,
            ..Module::default()
        };

        for (usr, entity) in &self.entities {
            match entity {
                Entity::Struct(c) => {
                    module.structs.insert(
                        usr.clone(),
                        Struct {
                            base: c.base.clone(),
                            fields: self.fields(&c.members),
                        },
                    );
                }
                Entity::Union(c) => {
                    module.unions.insert(
                        usr.clone(),
                        Union {
                            base: c.base.clone(),
                            fields: self.fields(&c.members),
                        },
                    );
                }
                Entity::Enum(c) => {
                    let constants = c
                        .members
                        .iter()
                        .filter_map(|member| match self.entities.get(member) {
                            Some(Entity::EnumConstant(constant)) => Some(constant.clone()),
                            _ => None,
                        })
                        .collect();
                    module.enums.insert(
                        usr.clone(),
                        Enum {
                            base: c.base.clone(),
                            constants,
                        },
                    );
                }
                Entity::Function(f) => {
                    let args = f
                        .params
                        .iter()
                        .filter_map(|member| match self.entities.get(member) {
                            Some(Entity::Param(param)) => Some(param.clone()),
                            _ => None,
                        })
                        .collect();
                    module.functions.insert(
                        usr.clone(),
                        Function {
                            base: f.base.clone(),
                            storage_class: f.storage_class,
                            inlined: f.inlined,
                            args,
                            return_type: f.return_type.clone(),
                        },
                    );
                }
                Entity::Typedef(t) => {
                    module.typedefs.insert(usr.clone(), t.clone());
                }
                Entity::Macro(m) => {
                    module.macros.insert(usr.clone(), m.clone());
                }
                Entity::MacroFunction(m) => {
                    module.macro_functions.insert(usr.clone(), m.clone());
                }
                Entity::Variable(v) => {
                    module.variables.insert(usr.clone(), v.clone());
                }
                // Embedded in their parents above.
                Entity::Field(_) | Entity::EnumConstant(_) | Entity::Param(_) => {}
            }
        }

        module
    }

    fn fields(&self, members: &[Usr]) -> Vec<Field> {
        members
            .iter()
            .filter_map(|member| match self.entities.get(member) {
                Some(Entity::Field(field)) => Some(field.clone()),
                _ => None,
            })
            .collect()
    }
}

// =====================================================
// Serialized module
// =====================================================

/// Everything documented in one translation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Title of the top-of-file comment
    pub name: String,
    /// Body of the top-of-file comment
    #[serde(default)]
    pub documentation: String,
    /// The translation unit this module was extracted from
    #[serde(default)]
    pub file: String,

    #[serde(default)]
    pub enums: IndexMap<Usr, Enum>,
    #[serde(default)]
    pub functions: IndexMap<Usr, Function>,
    #[serde(default)]
    pub macros: IndexMap<Usr, Macro>,
    #[serde(default)]
    pub macro_functions: IndexMap<Usr, MacroFunction>,
    #[serde(default)]
    pub structs: IndexMap<Usr, Struct>,
    #[serde(default)]
    pub typedefs: IndexMap<Usr, Typedef>,
    #[serde(default)]
    pub unions: IndexMap<Usr, Union>,
    #[serde(default)]
    pub variables: IndexMap<Usr, Variable>,
}

impl Module {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
