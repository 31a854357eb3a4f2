//! USR-style canonical identity keys, modelled on the strings libclang hands out.

/// Tag kinds as they appear inside a USR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Struct,
    Union,
    Enum,
    Class,
}

impl TagKind {
    pub fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "struct_specifier" => Some(TagKind::Struct),
            "union_specifier" => Some(TagKind::Union),
            "enum_specifier" => Some(TagKind::Enum),
            "class_specifier" => Some(TagKind::Class),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            TagKind::Struct => "struct",
            TagKind::Union => "union",
            TagKind::Enum => "enum",
            TagKind::Class => "class",
        }
    }

    fn marker(&self) -> &'static str {
        match self {
            TagKind::Struct => "S",
            TagKind::Union => "U",
            TagKind::Enum => "E",
            TagKind::Class => "S",
        }
    }
}

pub fn tag(scope: &str, kind: TagKind, name: &str) -> String {
    format!("c:{}@{}@{}", scope, kind.marker(), name)
}

/// An anonymous tag that takes its name from the typedef declaring it.
pub fn typedef_named_tag(scope: &str, kind: TagKind, typedef: &str) -> String {
    format!("c:{}@{}A@{}", scope, kind.marker(), typedef)
}

pub fn unnamed_tag(file: &str, offset: usize, kind: TagKind) -> String {
    format!("c:{}@{}@{}", file, offset, kind.marker())
}

pub fn field(parent: &str, name: &str) -> String {
    format!("{}@FI@{}", parent, name)
}

pub fn enum_constant(parent: &str, name: &str) -> String {
    format!("{}@{}", parent, name)
}

pub fn function(scope: &str, file: &str, name: &str, internal: bool) -> String {
    if internal {
        format!("c:{}@F@{}", file, name)
    } else {
        format!("c:{}@F@{}", scope, name)
    }
}

pub fn param(file: &str, offset: usize, function: &str, name: &str) -> String {
    format!("c:{}@{}@F@{}@{}", file, offset, function, name)
}

pub fn variable(scope: &str, file: &str, name: &str, internal: bool) -> String {
    if internal {
        format!("c:{}@{}", file, name)
    } else {
        format!("c:{}@{}", scope, name)
    }
}

pub fn typedef(file: &str, name: &str) -> String {
    format!("c:{}@T@{}", file, name)
}

pub fn macro_definition(file: &str, offset: usize, name: &str) -> String {
    format!("c:{}@{}@macro@{}", file, offset, name)
}

pub fn namespace(scope: &str, name: &str) -> String {
    format!("{}@N@{}", scope, name)
}
